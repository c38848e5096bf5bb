//! Error taxonomy for authenticated and passport-style calls.

use std::fmt;
use std::sync::Arc;

use crate::http::ApiResponse;

/// A logical failure reported by the server inside a response envelope.
///
/// Two errors are equal when code and message match; the attached response
/// is not compared.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: i64,
    pub message: String,
    response: Option<Box<ApiResponse>>,
}

impl ApiError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            response: None,
        }
    }

    pub fn with_response(mut self, response: ApiResponse) -> Self {
        self.response = Some(Box::new(response));
        self
    }

    /// The response that carried this failure, when there was one.
    pub fn response(&self) -> Option<&ApiResponse> {
        self.response.as_deref()
    }
}

impl PartialEq for ApiError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message
    }
}

impl Eq for ApiError {}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code: {}, message: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Every way a call through [`crate::Client`] can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection, TLS, timeout or protocol failure. Never retried.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The body was not a well-formed envelope, or did not fit the target type.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server answered with a logical failure.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Passport-style failure signalled through the `error` field.
    #[error("error: {error}, errno: {errno}")]
    Passport {
        error: String,
        errno: i64,
        response: Option<Box<ApiResponse>>,
    },

    /// The token refresh failed; the original request was not retried.
    #[error("token refresh failed: {0:#}")]
    Refresh(Arc<anyhow::Error>),
}

impl Error {
    /// Server code carried by a logical failure, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            Error::Api(api) => Some(api.code),
            _ => None,
        }
    }

    /// The HTTP response behind a logical or passport failure.
    pub fn response(&self) -> Option<&ApiResponse> {
        match self {
            Error::Api(api) => api.response(),
            Error::Passport { response, .. } => response.as_deref(),
            _ => None,
        }
    }

    /// Attaches `response` to a logical or passport failure; other kinds are
    /// returned unchanged.
    pub fn with_response(self, response: ApiResponse) -> Self {
        match self {
            Error::Api(api) => Error::Api(api.with_response(response)),
            Error::Passport { error, errno, .. } => Error::Passport {
                error,
                errno,
                response: Some(Box::new(response)),
            },
            other => other,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
