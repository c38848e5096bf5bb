//! Token refresh against the passport service.

use anyhow::Context;
use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::refresh::TokenRefresher;
use super::token::mask;
use crate::client::passport;
use crate::http::{HttpClient, RequestOptions};

/// Token pair returned by the refresh endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RefreshedTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
}

/// Exchanges a refresh token for a new access token, rotating the refresh
/// token when the server issues a new one.
pub struct PassportRefresher {
    http: HttpClient,
    url: String,
    refresh_token: Mutex<String>,
}

impl PassportRefresher {
    pub fn new(http: HttpClient, url: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            refresh_token: Mutex::new(refresh_token.into()),
        }
    }

    /// The refresh token the next refresh will present.
    pub async fn current_refresh_token(&self) -> String {
        self.refresh_token.lock().await.clone()
    }
}

#[async_trait]
impl TokenRefresher for PassportRefresher {
    #[tracing::instrument(skip(self))]
    async fn refresh_token(&self) -> anyhow::Result<String> {
        // Held for the whole exchange so two refreshes never present the same
        // refresh token.
        let mut refresh_token = self.refresh_token.lock().await;
        if refresh_token.is_empty() {
            anyhow::bail!("No refresh token configured");
        }

        debug!("Refreshing with refresh token {}", mask(&refresh_token));

        let options = RequestOptions::new().form([("refresh_token", refresh_token.as_str())]);
        let (_, envelope) = passport::exchange(&self.http, Method::POST, &self.url, &options)
            .await
            .with_context(|| format!("Refresh request to {} failed", self.url))?;
        let tokens: RefreshedTokens = envelope
            .data_as()
            .context("Failed to parse refreshed tokens")?;

        if tokens.access_token.is_empty() {
            anyhow::bail!("Refresh response carried no access token");
        }
        if !tokens.refresh_token.is_empty() {
            *refresh_token = tokens.refresh_token;
        }

        Ok(tokens.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn refresher(url: &str, token: &str) -> PassportRefresher {
        PassportRefresher::new(
            HttpClient::new(reqwest::Client::new()),
            format!("{}/open/refreshToken", url),
            token,
        )
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/open/refreshToken")
            .match_body(Matcher::UrlEncoded("refresh_token".into(), "R1".into()))
            .with_status(200)
            .with_body(
                r#"{"code":0,"error":"","data":{"access_token":"A2","refresh_token":"R2","expires_in":7200}}"#,
            )
            .create_async()
            .await;

        let refresher = refresher(&server.url(), "R1");
        let token = refresher.refresh_token().await.unwrap();

        mock.assert_async().await;
        assert_eq!(token, "A2");
        assert_eq!(refresher.current_refresh_token().await, "R2");
    }

    #[tokio::test]
    async fn test_refresh_keeps_refresh_token_when_not_rotated() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/open/refreshToken")
            .with_status(200)
            .with_body(r#"{"code":0,"data":{"access_token":"A2"}}"#)
            .create_async()
            .await;

        let refresher = refresher(&server.url(), "R1");
        assert_eq!(refresher.refresh_token().await.unwrap(), "A2");
        assert_eq!(refresher.current_refresh_token().await, "R1");
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/open/refreshToken")
            .with_status(200)
            .with_body(r#"{"code":40140120,"message":"refresh token expired"}"#)
            .create_async()
            .await;

        let refresher = refresher(&server.url(), "R1");
        let err = refresher.refresh_token().await.unwrap_err();

        assert!(format!("{:#}", err).contains("refresh token expired"));
        assert_eq!(refresher.current_refresh_token().await, "R1");
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let refresher = refresher("http://127.0.0.1:9", "");
        let err = refresher.refresh_token().await.unwrap_err();
        assert!(err.to_string().contains("No refresh token"));
    }
}
