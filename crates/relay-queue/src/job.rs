//! Job definitions

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Job Identifier: millisecond timestamp plus a four digit random suffix
pub type JobId = String;

/// One pending outbound HTTP delivery.
///
/// This is also the on-disk record; the persisted queue is a JSON array of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookJob {
    pub id: JobId,
    pub url: String,
    /// Opaque body, sent exactly as enqueued
    pub payload: serde_json::Value,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(alias = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl WebhookJob {
    pub fn new(
        url: impl Into<String>,
        payload: serde_json::Value,
        headers: HashMap<String, String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(now),
            url: url.into(),
            payload,
            headers,
            attempts: 0,
            created_at: now,
        }
    }
}

fn generate_id(now: DateTime<Utc>) -> JobId {
    let suffix: u16 = rand::rng().random_range(0..10_000);
    format!("{}{:04}", now.timestamp_millis(), suffix)
}

/// Retry backoff strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffStrategy {
    Constant { delay: Duration },
    Exponential { initial: Duration, multiplier: f64 },
}

impl BackoffStrategy {
    /// Pause after the `attempt`-th failed attempt (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Constant { delay } => *delay,
            Self::Exponential {
                initial,
                multiplier,
            } => {
                let exp = attempt.saturating_sub(1).min(16) as i32;
                let secs = initial.as_secs_f64() * multiplier.powi(exp);
                Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
            }
        }
    }
}

/// How many attempts a job gets and how long the processor pauses between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: BackoffStrategy,
}

impl RetryPolicy {
    /// True once a job with `attempts` failed attempts must be dropped.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: BackoffStrategy::Constant {
                delay: Duration::from_millis(5000),
            },
        }
    }
}
