//! Which server codes mean "the access token is no longer valid".

/// Code the API uses for an expired access token, independent of policy.
pub const TOKEN_EXPIRED_CODE: i64 = 99;

/// Default prefix of session-expiry codes (e.g. `40140116`).
pub const DEFAULT_EXPIRED_PREFIX: &str = "401";

#[cfg_attr(test, mockall::automock)]
pub trait SessionPolicy: Send + Sync {
    fn is_session_expired(&self, code: i64) -> bool;
}

/// Matches codes whose decimal form starts with any configured prefix.
#[derive(Debug, Clone)]
pub struct PrefixPolicy {
    prefixes: Vec<String>,
}

impl PrefixPolicy {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }
}

impl Default for PrefixPolicy {
    fn default() -> Self {
        Self::new([DEFAULT_EXPIRED_PREFIX])
    }
}

impl SessionPolicy for PrefixPolicy {
    fn is_session_expired(&self, code: i64) -> bool {
        let code = code.to_string();
        self.prefixes.iter().any(|p| code.starts_with(p.as_str()))
    }
}

/// Whether a failed attempt with `code` should trigger a refresh.
pub fn needs_refresh(policy: &dyn SessionPolicy, code: i64) -> bool {
    code == TOKEN_EXPIRED_CODE || policy.is_session_expired(code)
}
