//! Application State
//!
//! Shared handles for the queue, the inbound guard and the status collaborator.

use relay_queue::DeliveryQueue;
use std::sync::Arc;

use crate::guard::ApiKeyGuard;
use crate::status::StatusUpdateHandler;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    queue: Arc<DeliveryQueue>,
    guard: ApiKeyGuard,
    status_handler: Arc<dyn StatusUpdateHandler>,
}

impl AppState {
    pub fn new(
        queue: Arc<DeliveryQueue>,
        guard: ApiKeyGuard,
        status_handler: Arc<dyn StatusUpdateHandler>,
    ) -> Self {
        Self {
            queue,
            guard,
            status_handler,
        }
    }

    /// Get the delivery queue (cloned Arc for sharing)
    pub fn queue(&self) -> Arc<DeliveryQueue> {
        self.queue.clone()
    }

    pub fn guard(&self) -> &ApiKeyGuard {
        &self.guard
    }

    pub fn status_handler(&self) -> Arc<dyn StatusUpdateHandler> {
        self.status_handler.clone()
    }
}
