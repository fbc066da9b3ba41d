//! # Relay Queue
//!
//! Durable, at-least-once outbound webhook delivery.
//!
//! Features:
//! - Strict FIFO delivery with head-of-line retry
//! - Whole-file JSON persistence after every mutation
//! - Pluggable store (`JsonFileStore`, `MemoryStore`) and transport (`HttpDeliverer`)
//! - Single-flight background processor with bounded retries
//!
//! The file store rewrites the entire queue on each mutation, which is fine for
//! modest queue depths. An append-only log or embedded KV store can replace it
//! through [`QueueStore`] as long as reload-on-startup and overwrite-on-mutation
//! hold.

pub mod config;
pub mod delivery;
pub mod error;
pub mod job;
pub mod memory;
pub mod processor;
pub mod queue;
pub mod store;

pub use config::QueueConfig;
pub use delivery::{Deliverer, HttpDeliverer};
pub use error::{DeliveryError, QueueError};
pub use job::{BackoffStrategy, JobId, RetryPolicy, WebhookJob};
pub use memory::MemoryStore;
pub use processor::{PassStats, QueueProcessor};
pub use queue::{DeliveryQueue, FailureOutcome};
pub use store::{JsonFileStore, QueueStore};
