//! API routes

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use relay_queue::JobId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ApiError, ApiResult};
use crate::middleware::require_api_key;
use crate::state::AppState;
use crate::status::{StatusUpdate, StatusUpdateRequest};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub pending_jobs: usize,
    pub processing: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let queue = state.queue();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        pending_jobs: queue.len().await,
        processing: queue.is_processing(),
    })
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub success: bool,
    pub message: String,
}

/// Receive a status update from an external receiver
pub async fn status_update(
    State(state): State<AppState>,
    body: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> ApiResult<Json<StatusUpdateResponse>> {
    let Json(request) = body?;
    let update = StatusUpdate::try_from(request)?;

    tracing::debug!(
        report_id = %update.report_id,
        status = %update.status,
        "Applying status update"
    );
    state.status_handler().apply(update).await?;

    Ok(Json(StatusUpdateResponse {
        success: true,
        message: "Status updated successfully".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub url: String,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub id: JobId,
}

/// Queue a webhook for background delivery
pub async fn enqueue_webhook(
    State(state): State<AppState>,
    body: Result<Json<EnqueueRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<EnqueueResponse>)> {
    let Json(request) = body?;

    let url = request.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ApiError::BadRequest("url must be an http(s) URL".to_string()));
    }

    let id = state
        .queue()
        .enqueue(url, request.payload, request.headers)
        .await;

    Ok((StatusCode::ACCEPTED, Json(EnqueueResponse { id })))
}

/// Build the API router. Everything except `/health` requires the shared secret.
pub fn api_router(state: AppState) -> Router {
    let guarded = Router::new()
        .route("/api/integrations/status-update", post(status_update))
        .route("/api/webhooks", post(enqueue_webhook))
        .route_layer(middleware::from_fn_with_state(
            state.guard().clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(guarded)
        .with_state(state)
}
