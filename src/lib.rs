//! Authenticated HTTP client with transparent token refresh.
//!
//! Requests carry the current bearer token. When the API answers with a
//! session-expiry code, the token is refreshed (once, shared by all concurrent
//! callers) and the request is retried exactly once.

pub mod auth;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{ApiError, Error, Result};
