//! Shared fixtures for relay-queue integration tests.
//!
//! Mock receivers are wiremock responders; retry delays are shortened so the
//! full retry lifecycle runs in milliseconds.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use relay_queue::{DeliveryQueue, HttpDeliverer, QueueConfig, QueueProcessor, QueueStore};
use wiremock::{Request, Respond, ResponseTemplate};

pub fn fast_config(max_retries: u32, retry_delay_ms: u64) -> QueueConfig {
    QueueConfig {
        max_retries,
        retry_delay: Duration::from_millis(retry_delay_ms),
        delivery_timeout: Duration::from_secs(2),
        backoff_multiplier: None,
    }
}

/// Queue plus a processor delivering over real HTTP
pub async fn setup(
    store: Arc<dyn QueueStore>,
    config: &QueueConfig,
) -> (Arc<DeliveryQueue>, QueueProcessor) {
    let queue = Arc::new(DeliveryQueue::load(store).await);
    let deliverer = Arc::new(HttpDeliverer::new(config.delivery_timeout).unwrap());
    let processor = QueueProcessor::new(queue.clone(), deliverer, config.retry_policy());
    (queue, processor)
}

/// Fails the first `fail_times` requests with 500, then answers 200.
#[derive(Clone)]
pub struct FailingResponder {
    fail_times: u32,
    count: Arc<AtomicU32>,
}

impl FailingResponder {
    pub fn fail_times(fail_times: u32) -> Self {
        Self {
            fail_times,
            count: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn always() -> Self {
        Self::fail_times(u32::MAX)
    }

    pub fn request_count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }
}

impl Respond for FailingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.count.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_times {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(200)
        }
    }
}

/// Answers with a fixed status and records when each request arrived.
#[derive(Clone)]
pub struct TimedResponder {
    status: u16,
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl TimedResponder {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            arrivals: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn arrivals(&self) -> Vec<Instant> {
        self.arrivals.lock().unwrap().clone()
    }
}

impl Respond for TimedResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        ResponseTemplate::new(self.status)
    }
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
