//! Authenticated API client.
//!
//! Every authenticated call attaches the current bearer token and decodes the
//! auth-style envelope. When the server reports an expired session the token
//! is refreshed once and the call is retried once; a second failure is final.

pub(crate) mod passport;

use log::debug;
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::auth::{
    PrefixPolicy, RefreshCoordinator, SessionPolicy, TokenRefresher, TokenStore, needs_refresh,
};
use crate::config::ClientConfig;
use crate::envelope::AuthEnvelope;
use crate::error::Result;
use crate::http::{ApiResponse, HttpClient, RequestOptions};

#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    http: HttpClient,
    tokens: Arc<TokenStore>,
    refresh: Arc<RefreshCoordinator>,
    policy: Arc<dyn SessionPolicy>,
}

impl Client {
    pub fn new(config: ClientConfig, refresher: Arc<dyn TokenRefresher>) -> Result<Self> {
        let http = HttpClient::new(config.build_http_client()?);
        Ok(Self::with_http(config, http, refresher))
    }

    /// Uses an existing transport instead of building one from `config`.
    pub fn with_http(
        config: ClientConfig,
        http: HttpClient,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        let tokens = Arc::new(TokenStore::new(config.access_token.clone()));
        let refresh = Arc::new(RefreshCoordinator::new(refresher, Arc::clone(&tokens)));
        let policy = Arc::new(PrefixPolicy::new(config.expired_code_prefixes.clone()));

        Self {
            config: Arc::new(config),
            http,
            tokens,
            refresh,
            policy,
        }
    }

    /// Replaces the session-expiry policy.
    pub fn with_policy(mut self, policy: Arc<dyn SessionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub async fn access_token(&self) -> Option<String> {
        self.tokens.get().await
    }

    pub async fn set_access_token(&self, token: impl Into<String>) {
        self.tokens.set(token.into()).await;
    }

    /// Forces a refresh of the current token, joining one already in flight.
    pub async fn refresh_token(&self) -> Result<String> {
        let current = self.tokens.get().await;
        self.refresh.refresh(current.as_deref()).await
    }

    /// Plain request: no token, no envelope handling.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<ApiResponse> {
        let url = self.config.resolve_url(url);
        self.http.execute(method, &url, options, None).await
    }

    /// Authenticated call without a decode target.
    pub async fn auth_send(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<ApiResponse> {
        let (response, _) = self.authenticated(method, url, options).await?;
        Ok(response)
    }

    /// Authenticated call decoding the envelope's `data` into `T`.
    pub async fn auth_request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<T> {
        let (_, envelope) = self.authenticated(method, url, options).await?;
        envelope.data_as()
    }

    /// Authenticated call decoding the whole response body into `T`.
    pub async fn auth_request_raw<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<T> {
        let (response, _) = self.authenticated(method, url, options).await?;
        response.json()
    }

    /// Passport call without a decode target.
    pub async fn passport_send(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<ApiResponse> {
        let url = self.config.resolve_url(url);
        let (response, _) = passport::exchange(&self.http, method, &url, options).await?;
        Ok(response)
    }

    /// Passport call decoding the envelope's `data` into `T`.
    pub async fn passport_request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<T> {
        let url = self.config.resolve_url(url);
        let (_, envelope) = passport::exchange(&self.http, method, &url, options).await?;
        envelope.data_as()
    }

    /// Runs at most two attempts: the first, and one more after a refresh.
    #[tracing::instrument(skip(self, options))]
    async fn authenticated(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<(ApiResponse, AuthEnvelope)> {
        let url = self.config.resolve_url(url);
        let mut retried = false;

        loop {
            let token = self.tokens.get().await;
            let response = self
                .http
                .execute(method.clone(), &url, options, token.as_deref())
                .await?;
            let envelope = AuthEnvelope::decode(response.bytes())?;

            if envelope.state {
                return Ok((response, envelope));
            }

            if !retried && needs_refresh(self.policy.as_ref(), envelope.code) {
                debug!(
                    "{} {}: session expired (code {}), refreshing token",
                    method, url, envelope.code
                );
                self.refresh.refresh(token.as_deref()).await?;
                retried = true;
                continue;
            }

            return Err(envelope.to_error().with_response(response).into());
        }
    }
}
