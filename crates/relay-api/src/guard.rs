//! Shared-secret authentication for inbound callbacks
//!
//! Callers present the secret either in `X-API-KEY` or as
//! `Authorization: Bearer <secret>`. The check is stateless.

use axum::http::HeaderMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::ApiError;

/// Dedicated API key header
pub const API_KEY_HEADER: &str = "x-api-key";

/// Used only when no secret is configured. Not suitable for production.
pub const INSECURE_DEFAULT_KEY: &str = "relay-insecure-default-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Reject,
}

/// The presented credential, preferring `X-API-KEY` over `Authorization`.
///
/// A leading `Bearer ` is stripped from whichever header is used.
pub fn extract_credential(headers: &HeaderMap) -> Option<&str> {
    let raw = [API_KEY_HEADER, "authorization"]
        .into_iter()
        .filter_map(|name| headers.get(name).and_then(|v| v.to_str().ok()))
        .find(|v| !v.is_empty())?;

    Some(raw.strip_prefix("Bearer ").unwrap_or(raw))
}

/// Compare the presented credential with `expected`, byte for byte.
pub fn validate(headers: &HeaderMap, expected: &str) -> GuardDecision {
    match extract_credential(headers) {
        Some(provided) if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) => {
            GuardDecision::Allow
        }
        _ => GuardDecision::Reject,
    }
}

/// Holds the configured secret
#[derive(Clone)]
pub struct ApiKeyGuard {
    expected: Arc<str>,
}

impl ApiKeyGuard {
    pub fn new(secret: &str) -> Self {
        Self {
            expected: Arc::from(secret),
        }
    }

    pub fn validate(&self, headers: &HeaderMap) -> GuardDecision {
        validate(headers, &self.expected)
    }

    /// `Ok` when the request may proceed, `Forbidden` otherwise
    pub fn check(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        match self.validate(headers) {
            GuardDecision::Allow => Ok(()),
            GuardDecision::Reject => Err(ApiError::Forbidden("Invalid API Key".to_string())),
        }
    }
}

impl std::fmt::Debug for ApiKeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGuard")
            .field("expected", &"<redacted>")
            .finish()
    }
}
