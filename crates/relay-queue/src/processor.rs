//! Single-flight queue processor

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::delivery::Deliverer;
use crate::job::RetryPolicy;
use crate::queue::{DeliveryQueue, FailureOutcome};

/// Counts for one processing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub delivered: usize,
    pub retried: usize,
    pub dropped: usize,
}

/// Drains the queue head-first, one job at a time.
///
/// A failing head job is retried in place and the whole processor pauses for the
/// backoff delay, so jobs behind it wait too. Ordering is strict: job N+1 is never
/// attempted before job N is delivered or dropped.
pub struct QueueProcessor {
    queue: Arc<DeliveryQueue>,
    deliverer: Arc<dyn Deliverer>,
    policy: RetryPolicy,
}

impl QueueProcessor {
    pub fn new(
        queue: Arc<DeliveryQueue>,
        deliverer: Arc<dyn Deliverer>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            queue,
            deliverer,
            policy,
        }
    }

    /// Run one pass until the queue is empty.
    ///
    /// Returns immediately with empty stats if another pass is already active.
    pub async fn process_pending(&self) -> PassStats {
        let mut stats = PassStats::default();

        let Some(_guard) = self.queue.try_begin_processing() else {
            debug!("Processing pass already active");
            return stats;
        };

        while let Some(job) = self.queue.head().await {
            info!(
                job_id = %job.id,
                url = %job.url,
                attempt = job.attempts + 1,
                max_retries = self.policy.max_retries,
                "Processing webhook"
            );

            let error = match self.deliverer.deliver(&job).await {
                Ok(()) => {
                    self.queue.complete_head(&job.id).await;
                    info!(job_id = %job.id, "Webhook delivered");
                    stats.delivered += 1;
                    continue;
                }
                Err(e) => e,
            };

            warn!(job_id = %job.id, url = %job.url, error = %error, "Webhook delivery failed");

            match self.queue.record_failure(&job.id, &self.policy).await {
                Some(FailureOutcome::Dropped { attempts }) => {
                    error!(
                        job_id = %job.id,
                        url = %job.url,
                        attempts,
                        "Max retries reached, dropping webhook"
                    );
                    stats.dropped += 1;
                }
                Some(FailureOutcome::Retrying { attempts }) => {
                    let delay = self.policy.backoff.delay(attempts);
                    debug!(
                        job_id = %job.id,
                        attempts,
                        delay_ms = (delay.as_millis() as u64),
                        "Pausing before retry"
                    );
                    stats.retried += 1;
                    tokio::time::sleep(delay).await;
                }
                None => {}
            }
        }

        stats
    }

    /// Process whenever work arrives. Never returns.
    pub async fn run(self) {
        info!(max_retries = self.policy.max_retries, "Queue processor started");
        loop {
            let stats = self.process_pending().await;
            if stats != PassStats::default() {
                debug!(
                    delivered = stats.delivered,
                    retried = stats.retried,
                    dropped = stats.dropped,
                    "Processing pass finished"
                );
            }
            self.queue.wait_for_work().await;
        }
    }

    /// Run on a dedicated background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeliveryError;
    use crate::job::{BackoffStrategy, WebhookJob};
    use crate::memory::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records attempted URLs and fails the first `fail_first` attempts
    #[derive(Default)]
    struct ScriptedDeliverer {
        attempts: Mutex<Vec<String>>,
        fail_first: usize,
    }

    #[async_trait]
    impl Deliverer for ScriptedDeliverer {
        async fn deliver(&self, job: &WebhookJob) -> Result<(), DeliveryError> {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(job.url.clone());
            if attempts.len() <= self.fail_first {
                Err(DeliveryError::Status(503))
            } else {
                Ok(())
            }
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff: BackoffStrategy::Constant {
                delay: Duration::from_millis(1),
            },
        }
    }

    #[tokio::test]
    async fn test_pass_on_empty_queue_is_noop() {
        let queue = Arc::new(DeliveryQueue::load(Arc::new(MemoryStore::new())).await);
        let deliverer = Arc::new(ScriptedDeliverer::default());
        let processor = QueueProcessor::new(queue, deliverer.clone(), fast_policy(5));

        assert_eq!(processor.process_pending().await, PassStats::default());
        assert!(deliverer.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retry_then_deliver() {
        let queue = Arc::new(DeliveryQueue::load(Arc::new(MemoryStore::new())).await);
        let deliverer = Arc::new(ScriptedDeliverer {
            fail_first: 2,
            ..Default::default()
        });
        let processor = QueueProcessor::new(queue.clone(), deliverer.clone(), fast_policy(5));

        queue.enqueue("http://a", json!({}), None).await;
        let stats = processor.process_pending().await;

        assert_eq!(
            stats,
            PassStats {
                delivered: 1,
                retried: 2,
                dropped: 0
            }
        );
        assert_eq!(deliverer.attempts.lock().unwrap().len(), 3);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_pass_is_skipped() {
        let queue = Arc::new(DeliveryQueue::load(Arc::new(MemoryStore::new())).await);
        let deliverer = Arc::new(ScriptedDeliverer::default());
        let processor = QueueProcessor::new(queue.clone(), deliverer.clone(), fast_policy(5));

        queue.enqueue("http://a", json!({}), None).await;
        let _active = queue.try_begin_processing().unwrap();

        assert_eq!(processor.process_pending().await, PassStats::default());
        assert_eq!(queue.len().await, 1);
    }
}
