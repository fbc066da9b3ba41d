//! In-memory queue store

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::error::QueueError;
use crate::job::WebhookJob;
use crate::store::QueueStore;

/// Keeps the last saved job list in memory.
///
/// Useful for tests (inspect or seed what "disk" holds, simulate a restart by
/// loading a second queue from the same store) and for deployments that accept
/// losing pending jobs on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: RwLock<Vec<WebhookJob>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing persisted state
    pub fn with_jobs(jobs: Vec<WebhookJob>) -> Self {
        Self {
            saved: RwLock::new(jobs),
            ..Default::default()
        }
    }

    /// What the store currently holds
    pub async fn persisted(&self) -> Vec<WebhookJob> {
        self.saved.read().await.clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail (or succeed again)
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self) -> Result<Vec<WebhookJob>, QueueError> {
        Ok(self.saved.read().await.clone())
    }

    async fn save(&self, jobs: &[WebhookJob]) -> Result<(), QueueError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(QueueError::Backend("save rejected".to_string()));
        }
        *self.saved.write().await = jobs.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_empty());

        let job = WebhookJob::new("http://sink", json!({"foo": "bar"}), HashMap::new());
        store.save(std::slice::from_ref(&job)).await.unwrap();

        assert_eq!(store.load().await.unwrap(), vec![job]);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_saves_keep_previous_state() {
        let job = WebhookJob::new("http://sink", json!({}), HashMap::new());
        let store = MemoryStore::with_jobs(vec![job.clone()]);

        store.set_fail_saves(true);
        assert!(store.save(&[]).await.is_err());
        assert_eq!(store.persisted().await, vec![job]);
        assert_eq!(store.save_count(), 0);
    }
}
