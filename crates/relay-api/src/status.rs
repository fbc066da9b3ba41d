//! Status-update callbacks from external receivers
//!
//! A receiver that accepted a forwarded report later calls back with its
//! progress. What the host service does with that is up to the
//! [`StatusUpdateHandler`] it plugs in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Callback body as sent on the wire
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub report_id: Option<String>,
    pub status: Option<String>,
    pub responder_eta: Option<String>,
    pub note: Option<String>,
}

/// A validated status update
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub report_id: String,
    /// Lowercased
    pub status: String,
    pub responder_eta: Option<String>,
    pub note: Option<String>,
}

impl StatusUpdate {
    pub fn is_resolved(&self) -> bool {
        self.status == "resolved"
    }
}

impl TryFrom<StatusUpdateRequest> for StatusUpdate {
    type Error = ApiError;

    fn try_from(req: StatusUpdateRequest) -> Result<Self, Self::Error> {
        let non_empty =
            |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        match (non_empty(req.report_id), non_empty(req.status)) {
            (Some(report_id), Some(status)) => Ok(Self {
                report_id,
                status: status.to_lowercase(),
                responder_eta: non_empty(req.responder_eta),
                note: non_empty(req.note),
            }),
            _ => Err(ApiError::BadRequest("reportId and status are required".to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatusUpdateError {
    #[error("Report not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

/// Applies status updates to whatever owns the reports
#[async_trait]
pub trait StatusUpdateHandler: Send + Sync {
    async fn apply(&self, update: StatusUpdate) -> Result<(), StatusUpdateError>;
}

/// Logs updates and accepts them
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingStatusHandler;

#[async_trait]
impl StatusUpdateHandler for LoggingStatusHandler {
    async fn apply(&self, update: StatusUpdate) -> Result<(), StatusUpdateError> {
        tracing::info!(
            report_id = %update.report_id,
            status = %update.status,
            responder_eta = update.responder_eta.as_deref().unwrap_or("-"),
            resolved = update.is_resolved(),
            "Received status update"
        );
        Ok(())
    }
}
