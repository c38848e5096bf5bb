//! Reusable request configuration.

use bytes::Bytes;
use reqwest::RequestBuilder;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Body {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
    Raw(Bytes),
}

/// Headers, query, body and timeout for one logical call.
///
/// Options are applied to every attempt, so a retried request is rebuilt from
/// the same configuration.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Body>,
    timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Some(Body::Json(value));
        self
    }

    pub fn form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.body = Some(Body::Form(pairs));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(Body::Raw(body.into()));
        self
    }

    /// Deadline for a single attempt, overriding the client-wide timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn apply(&self, mut builder: RequestBuilder) -> RequestBuilder {
        if !self.headers.is_empty() {
            builder = builder.headers(self.headers.clone());
        }
        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        match &self.body {
            Some(Body::Json(value)) => builder.json(value),
            Some(Body::Form(pairs)) => builder.form(pairs),
            Some(Body::Raw(bytes)) => builder.body(bytes.clone()),
            None => builder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::CONTENT_TYPE;

    fn build(opts: &RequestOptions) -> reqwest::Request {
        let client = reqwest::Client::new();
        opts.apply(client.post("http://localhost/items"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_apply_query_and_headers() {
        let opts = RequestOptions::new()
            .query("page", "1")
            .query("per_page", "10")
            .header(
                HeaderName::from_static("x-trace"),
                HeaderValue::from_static("abc"),
            );
        let req = build(&opts);

        assert_eq!(req.url().query(), Some("page=1&per_page=10"));
        assert_eq!(req.headers()["x-trace"], "abc");
    }

    #[test]
    fn test_apply_json_body() {
        let opts = RequestOptions::new().json(serde_json::json!({"name": "a"}));
        let req = build(&opts);

        assert_eq!(req.headers()[CONTENT_TYPE], "application/json");
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, br#"{"name":"a"}"#);
    }

    #[test]
    fn test_apply_form_body() {
        let opts = RequestOptions::new().form([("refresh_token", "r1")]);
        let req = build(&opts);

        assert_eq!(
            req.headers()[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, b"refresh_token=r1");
    }

    #[test]
    fn test_apply_timeout() {
        let opts = RequestOptions::new().timeout(Duration::from_secs(3));
        let req = build(&opts);
        assert_eq!(req.timeout(), Some(&Duration::from_secs(3)));
    }

    #[test]
    fn test_options_are_reusable() {
        let opts = RequestOptions::new().body("payload");
        let first = build(&opts);
        let second = build(&opts);
        assert_eq!(
            first.body().and_then(|b| b.as_bytes()),
            second.body().and_then(|b| b.as_bytes())
        );
    }
}
