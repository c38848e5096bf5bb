use tokio::sync::RwLock;

/// Holds the current access token.
///
/// Writes replace the whole value under the write lock, so a reader sees
/// either the old or the new token.
#[derive(Debug, Default)]
pub struct TokenStore {
    pub(super) token: RwLock<Option<String>>,
}

impl TokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty())),
        }
    }

    /// Current token, `None` when no non-empty token is held.
    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn set(&self, token: String) {
        let token = Some(token).filter(|t| !t.is_empty());
        *self.token.write().await = token;
    }
}

/// Shortens a credential for log output.
pub fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_token_is_none() {
        let store = TokenStore::new(Some(String::new()));
        assert_eq!(store.get().await, None);

        store.set("T1".to_string()).await;
        assert_eq!(store.get().await.as_deref(), Some("T1"));

        store.set(String::new()).await;
        assert_eq!(store.get().await, None);
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("short"), "***");
        assert_eq!(mask("abcd0123456789wxyz"), "abcd***wxyz");
    }
}
