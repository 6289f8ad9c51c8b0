//! Exponential backoff for flaky asynchronous calls.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackoffConfig {
    /// Number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub retry_delay_ms: u64,
    pub retry_delay_multiplier: f64,
    /// Upper bound for a single delay, in milliseconds.
    pub retry_delay_max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            retry_delay_multiplier: 2.0,
            retry_delay_max_ms: 10_000,
        }
    }
}

impl BackoffConfig {
    /// Delay before retry number `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let scaled = self.retry_delay_ms as f64 * self.retry_delay_multiplier.powi(retry as i32);
        Duration::from_millis(scaled.min(self.retry_delay_max_ms as f64) as u64)
    }
}

/// Run `f` until it succeeds or the retry budget is exhausted, sleeping between
/// attempts. Returns the last error on failure.
pub async fn exponential_backoff<T, E, F, Fut>(mut f: F, config: &BackoffConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut retry = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if retry < config.max_retries => {
                let delay = config.delay_for(retry);
                warn!(
                    attempt = retry + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> BackoffConfig {
        BackoffConfig {
            max_retries: 3,
            retry_delay_ms: 1,
            retry_delay_multiplier: 2.0,
            retry_delay_max_ms: 5,
        }
    }

    #[test]
    fn test_delays_are_capped() {
        let config = BackoffConfig::default();
        assert_eq!(config.delay_for(0), Duration::from_millis(1000));
        assert_eq!(config.delay_for(2), Duration::from_millis(4000));
        assert_eq!(config.delay_for(10), Duration::from_millis(10_000));
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<u32, String> = exponential_backoff(
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(format!("attempt {n} failed"))
                } else {
                    Ok(n)
                }
            },
            &fast(),
        )
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), &str> = exponential_backoff(
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("down")
            },
            &fast(),
        )
        .await;
        assert_eq!(result, Err("down"));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }
}
