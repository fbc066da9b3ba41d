//! # Relay API
//!
//! Inbound HTTP surface for the relay delivery queue.
//!
//! Features:
//! - Shared-secret guard (`X-API-KEY` or `Authorization: Bearer`)
//! - Status-update callbacks from external receivers
//! - HTTP enqueue endpoint for out-of-process collaborators
//! - Graceful shutdown with the queue processor on a background task

pub mod error;
pub mod guard;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod status;

pub use error::{ApiError, ApiResult};
pub use guard::{ApiKeyGuard, GuardDecision};
pub use server::{RelayServer, ServerConfig};
pub use state::AppState;
pub use status::{LoggingStatusHandler, StatusUpdate, StatusUpdateError, StatusUpdateHandler};
