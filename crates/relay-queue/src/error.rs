//! Error types for persistence and delivery

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Corrupt queue state: {0}")]
    Corrupt(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Why a single delivery attempt failed.
///
/// Every variant is treated as transient by the processor.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Receiver responded with status {0}")]
    Status(u16),
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    #[error("Request failed: {0}")]
    Request(String),
}
