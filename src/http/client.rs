//! Thin transport over reqwest: one request in, one buffered response out.

use log::debug;
use reqwest::{Client, Method};

use super::{ApiResponse, RequestOptions};
use crate::error::Result;

/// Executes raw HTTP exchanges. Knows nothing about envelopes or tokens
/// beyond attaching the bearer credential it is handed.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Sends a single request. Non-2xx statuses are returned as responses;
    /// only connection and protocol failures are errors.
    #[tracing::instrument(skip(self, options, bearer))]
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
        bearer: Option<&str>,
    ) -> Result<ApiResponse> {
        debug!("{} {} (authenticated: {})...", method, url, bearer.is_some());

        let mut builder = options.apply(self.client.request(method, url));
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let response = ApiResponse::read(response).await?;

        debug!("{} -> {} ({} bytes)", url, response.status(), response.bytes().len());
        Ok(response)
    }
}
