use log::debug;
use reqwest::Client;
use std::time::Duration;

use crate::auth::{DEFAULT_EXPIRED_PREFIX, mask};
use crate::error::Result;

pub const DEFAULT_USER_AGENT: &str = concat!("authsdk/", env!("AUTHSDK_VERSION"));

/// Settings for a [`crate::Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Prefix for relative request URLs.
    pub base_url: Option<String>,
    pub user_agent: String,
    /// Client-wide deadline for each attempt.
    pub timeout: Option<Duration>,
    /// Token to start with; may be empty until the first refresh.
    pub access_token: Option<String>,
    /// Code prefixes treated as an expired session.
    pub expired_code_prefixes: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
            access_token: None,
            expired_code_prefixes: vec![DEFAULT_EXPIRED_PREFIX.to_string()],
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_expired_code_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expired_code_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the underlying reqwest client.
    pub fn build_http_client(&self) -> Result<Client> {
        if let Some(token) = self.access_token.as_deref().filter(|t| !t.is_empty()) {
            debug!("Using configured access token: {}", mask(token));
        }

        let mut builder = Client::builder().user_agent(self.user_agent.as_str());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }

    /// Absolute URLs pass through, anything else is joined to `base_url`.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        match self.base_url.as_deref() {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            ),
            None => url.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert!(config.base_url.is_none());
        assert!(config.user_agent.starts_with("authsdk/"));
        assert_eq!(config.expired_code_prefixes, vec!["401".to_string()]);
    }

    #[test]
    fn test_resolve_url() {
        let config = ClientConfig::new("https://api.example.com/");
        assert_eq!(
            config.resolve_url("/v1/items"),
            "https://api.example.com/v1/items"
        );
        assert_eq!(
            config.resolve_url("v1/items"),
            "https://api.example.com/v1/items"
        );
        assert_eq!(
            config.resolve_url("http://other.example.com/x"),
            "http://other.example.com/x"
        );
        assert_eq!(ClientConfig::default().resolve_url("/x"), "/x");
    }

    #[test]
    fn test_builder_setters() {
        let config = ClientConfig::new("http://localhost")
            .with_access_token("T1")
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("custom/1.0")
            .with_expired_code_prefixes(["401", "990"]);

        assert_eq!(config.access_token.as_deref(), Some("T1"));
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.expired_code_prefixes.len(), 2);
    }

    #[tokio::test]
    async fn test_http_client_sends_user_agent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("user-agent", "custom/1.0")
            .with_status(200)
            .create_async()
            .await;

        let client = ClientConfig::default()
            .with_user_agent("custom/1.0")
            .build_http_client()
            .unwrap();
        client.get(server.url()).send().await.unwrap();

        mock.assert_async().await;
    }
}
