//! Passport-style calls: no bearer token, no refresh, two failure kinds.

use reqwest::Method;

use crate::envelope::PassportEnvelope;
use crate::error::Result;
use crate::http::{ApiResponse, HttpClient, RequestOptions};

/// Executes one passport call and validates its envelope.
#[tracing::instrument(skip(http, options))]
pub(crate) async fn exchange(
    http: &HttpClient,
    method: Method,
    url: &str,
    options: &RequestOptions,
) -> Result<(ApiResponse, PassportEnvelope)> {
    let response = http.execute(method, url, options, None).await?;
    let envelope = PassportEnvelope::decode(response.bytes())?;
    if let Err(e) = envelope.check() {
        return Err(e.with_response(response));
    }
    Ok((response, envelope))
}
