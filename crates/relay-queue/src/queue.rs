//! The durable delivery queue
//!
//! One ordered job list per process. Every mutation is written through to the
//! [`QueueStore`] before the call returns; a failed write is logged and the
//! in-memory list stays authoritative.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info};

use crate::job::{JobId, RetryPolicy, WebhookJob};
use crate::store::QueueStore;

/// What happened to the head job after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Attempts recorded, job stays at the head
    Retrying { attempts: u32 },
    /// Retry budget exhausted, job removed
    Dropped { attempts: u32 },
}

pub struct DeliveryQueue {
    jobs: Mutex<VecDeque<WebhookJob>>,
    store: Arc<dyn QueueStore>,
    signal: Notify,
    processing: AtomicBool,
}

impl std::fmt::Debug for DeliveryQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryQueue")
            .field("store", &self.store)
            .field("processing", &self.is_processing())
            .finish_non_exhaustive()
    }
}

impl DeliveryQueue {
    /// Restore the queue from `store`.
    ///
    /// Unreadable or corrupt state is logged and replaced by an empty queue.
    pub async fn load(store: Arc<dyn QueueStore>) -> Self {
        let jobs = match store.load().await {
            Ok(jobs) => {
                info!(store = store.name(), pending = jobs.len(), "Loaded pending webhooks");
                jobs
            }
            Err(e) => {
                error!(store = store.name(), error = %e, "Failed to load queue, starting empty");
                Vec::new()
            }
        };

        Self {
            jobs: Mutex::new(jobs.into()),
            store,
            signal: Notify::new(),
            processing: AtomicBool::new(false),
        }
    }

    /// Append a delivery job and wake the processor.
    ///
    /// Returns once the job is persisted; delivery happens in the background and
    /// its outcome is never reported back.
    pub async fn enqueue(
        &self,
        url: impl Into<String>,
        payload: serde_json::Value,
        headers: Option<HashMap<String, String>>,
    ) -> JobId {
        let job = WebhookJob::new(url, payload, headers.unwrap_or_default());
        let id = job.id.clone();

        {
            let mut jobs = self.jobs.lock().await;
            debug!(job_id = %id, url = %job.url, depth = jobs.len() + 1, "Enqueued webhook");
            jobs.push_back(job);
            self.persist(&mut jobs).await;
        }

        self.signal.notify_one();
        id
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }

    /// Copy of the pending jobs, head first
    pub async fn snapshot(&self) -> Vec<WebhookJob> {
        self.jobs.lock().await.iter().cloned().collect()
    }

    /// Whether a processing pass is active
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub(crate) async fn head(&self) -> Option<WebhookJob> {
        self.jobs.lock().await.front().cloned()
    }

    /// Remove the head after a successful delivery.
    pub(crate) async fn complete_head(&self, id: &str) -> bool {
        let mut jobs = self.jobs.lock().await;
        if jobs.front().map(|j| j.id.as_str()) != Some(id) {
            return false;
        }
        jobs.pop_front();
        self.persist(&mut jobs).await;
        true
    }

    /// Count a failed attempt against the head, dropping it once `policy` is exhausted.
    pub(crate) async fn record_failure(
        &self,
        id: &str,
        policy: &RetryPolicy,
    ) -> Option<FailureOutcome> {
        let mut jobs = self.jobs.lock().await;
        let head = jobs.front_mut().filter(|j| j.id == id)?;

        head.attempts += 1;
        let attempts = head.attempts;
        let outcome = if policy.is_exhausted(attempts) {
            jobs.pop_front();
            FailureOutcome::Dropped { attempts }
        } else {
            FailureOutcome::Retrying { attempts }
        };

        self.persist(&mut jobs).await;
        Some(outcome)
    }

    pub(crate) async fn wait_for_work(&self) {
        self.signal.notified().await;
    }

    pub(crate) fn try_begin_processing(&self) -> Option<ProcessingGuard<'_>> {
        self.processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| ProcessingGuard(&self.processing))
    }

    // Called with the jobs lock held, which keeps whole-file writes in order.
    async fn persist(&self, jobs: &mut VecDeque<WebhookJob>) {
        if let Err(e) = self.store.save(jobs.make_contiguous()).await {
            error!(store = self.store.name(), error = %e, "Failed to save queue");
        }
    }
}

/// Clears the processing flag when a pass ends
pub(crate) struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::JsonFileStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_enqueue_persists_before_returning() {
        let store = Arc::new(MemoryStore::new());
        let queue = DeliveryQueue::load(store.clone()).await;

        let id = queue.enqueue("http://sink/ok", json!({"a": 1}), None).await;

        let persisted = store.persisted().await;
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].id, id);
        assert_eq!(persisted[0].attempts, 0);
        assert!(persisted[0].headers.is_empty());
    }

    #[tokio::test]
    async fn test_enqueue_keeps_fifo_order() {
        let queue = DeliveryQueue::load(Arc::new(MemoryStore::new())).await;

        let id1 = queue.enqueue("http://a", json!(1), None).await;
        let id2 = queue.enqueue("http://b", json!(2), None).await;
        let id3 = queue.enqueue("http://c", json!(3), None).await;

        let ids: Vec<_> = queue.snapshot().await.into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![id1.clone(), id2, id3]);
        assert_eq!(queue.head().await.map(|j| j.id), Some(id1));
    }

    #[tokio::test]
    async fn test_corrupt_state_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        std::fs::write(&path, "[{\"broken\": ").unwrap();

        let queue = DeliveryQueue::load(Arc::new(JsonFileStore::new(&path))).await;
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_save_failure_is_not_fatal() {
        let store = Arc::new(MemoryStore::new());
        let queue = DeliveryQueue::load(store.clone()).await;
        store.set_fail_saves(true);

        queue.enqueue("http://sink", json!({}), None).await;

        assert_eq!(queue.len().await, 1);
        assert!(store.persisted().await.is_empty());
    }

    #[tokio::test]
    async fn test_record_failure_until_dropped() {
        let store = Arc::new(MemoryStore::new());
        let queue = DeliveryQueue::load(store.clone()).await;
        let policy = RetryPolicy {
            max_retries: 2,
            ..Default::default()
        };

        let id = queue.enqueue("http://sink", json!({}), None).await;

        let first = queue.record_failure(&id, &policy).await;
        assert_eq!(first, Some(FailureOutcome::Retrying { attempts: 1 }));
        assert_eq!(store.persisted().await[0].attempts, 1);

        let second = queue.record_failure(&id, &policy).await;
        assert_eq!(second, Some(FailureOutcome::Dropped { attempts: 2 }));
        assert!(queue.is_empty().await);
        assert!(store.persisted().await.is_empty());
    }

    #[tokio::test]
    async fn test_mutations_only_touch_matching_head() {
        let queue = DeliveryQueue::load(Arc::new(MemoryStore::new())).await;
        queue.enqueue("http://a", json!({}), None).await;
        let second = queue.enqueue("http://b", json!({}), None).await;

        assert!(!queue.complete_head(&second).await);
        assert!(queue
            .record_failure(&second, &RetryPolicy::default())
            .await
            .is_none());
        assert_eq!(queue.len().await, 2);
    }

    #[tokio::test]
    async fn test_processing_guard_is_exclusive() {
        let queue = DeliveryQueue::load(Arc::new(MemoryStore::new())).await;

        let guard = queue.try_begin_processing().expect("first pass");
        assert!(queue.is_processing());
        assert!(queue.try_begin_processing().is_none());

        drop(guard);
        assert!(!queue.is_processing());
        assert!(queue.try_begin_processing().is_some());
    }
}
