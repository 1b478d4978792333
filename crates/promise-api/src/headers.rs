//! Cross-cutting request headers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;

pub const IDEMPOTENCY_KEY: &str = "idempotency-key";
pub const STRICT: &str = "strict";

/// Idempotency key and strict flag as sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub idempotency_key: Option<String>,
    /// True only for the exact header value `true`.
    pub strict: bool,
}

impl RequestOptions {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        Self {
            idempotency_key: text(IDEMPOTENCY_KEY).map(str::to_string),
            strict: text(STRICT) == Some("true"),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestOptions {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
