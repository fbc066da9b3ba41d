//! Queue configuration
//!
//! Reads retry and timeout settings from the environment.

use std::env;
use std::time::Duration;

use crate::job::{BackoffStrategy, RetryPolicy};

/// Delivery and retry settings
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Attempts before a job is dropped (env: RELAY_MAX_RETRIES)
    pub max_retries: u32,
    /// Processor pause after a failed attempt (env: RELAY_RETRY_DELAY_MS)
    pub retry_delay: Duration,
    /// Per-request timeout (env: RELAY_DELIVERY_TIMEOUT_MS)
    pub delivery_timeout: Duration,
    /// Grow the pause by this factor per attempt (env: RELAY_BACKOFF_MULTIPLIER).
    /// `None` keeps the pause constant.
    pub backoff_multiplier: Option<f64>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay: Duration::from_millis(5000),
            delivery_timeout: Duration::from_millis(10_000),
            backoff_multiplier: None,
        }
    }
}

impl QueueConfig {
    /// Load configuration from environment variables.
    ///
    /// Missing or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_retries = parse_env("RELAY_MAX_RETRIES")
            .filter(|n: &u32| *n > 0)
            .unwrap_or(defaults.max_retries);
        let retry_delay = parse_env("RELAY_RETRY_DELAY_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_delay);
        let delivery_timeout = parse_env("RELAY_DELIVERY_TIMEOUT_MS")
            .filter(|ms: &u64| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.delivery_timeout);
        let backoff_multiplier = parse_env("RELAY_BACKOFF_MULTIPLIER")
            .filter(|m: &f64| m.is_finite() && *m > 1.0)
            .map(|m: f64| m.min(10.0));

        Self {
            max_retries,
            retry_delay,
            delivery_timeout,
            backoff_multiplier,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let backoff = match self.backoff_multiplier {
            Some(multiplier) => BackoffStrategy::Exponential {
                initial: self.retry_delay,
                multiplier,
            },
            None => BackoffStrategy::Constant {
                delay: self.retry_delay,
            },
        };

        RetryPolicy {
            max_retries: self.max_retries,
            backoff,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_delay, Duration::from_secs(5));
        assert_eq!(config.delivery_timeout, Duration::from_secs(10));
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_multiplier_selects_exponential_backoff() {
        let config = QueueConfig {
            backoff_multiplier: Some(2.0),
            retry_delay: Duration::from_millis(100),
            ..Default::default()
        };

        let policy = config.retry_policy();
        assert_eq!(policy.backoff.delay(1), Duration::from_millis(100));
        assert_eq!(policy.backoff.delay(3), Duration::from_millis(400));
    }

    #[test]
    fn test_from_env_reads_overrides() {
        // Only this test touches these variables
        env::set_var("RELAY_MAX_RETRIES", "3");
        env::set_var("RELAY_RETRY_DELAY_MS", "250");
        env::set_var("RELAY_DELIVERY_TIMEOUT_MS", "not-a-number");

        let config = QueueConfig::from_env();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(config.delivery_timeout, Duration::from_secs(10));

        env::remove_var("RELAY_MAX_RETRIES");
        env::remove_var("RELAY_RETRY_DELAY_MS");
        env::remove_var("RELAY_DELIVERY_TIMEOUT_MS");
    }
}
