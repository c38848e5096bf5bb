//! HTTP transport: request options, buffered responses and the raw executor.

mod client;
mod options;
mod response;

pub use client::HttpClient;
pub use options::RequestOptions;
pub use response::ApiResponse;
pub use reqwest::Method;
