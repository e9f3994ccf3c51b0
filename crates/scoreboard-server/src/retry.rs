//! Retry with exponential backoff for cache writes.
//!
//! Every write into the ranking store or the name cache goes through a
//! [`RetryPolicy`]. Reads never retry: a failed read is reported at once or
//! degrades to the durable store.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::metrics;

/// Errors that can tell a transient failure from a permanent one.
pub trait Retryable {
    /// `true` if the same call may succeed when repeated.
    fn is_transient(&self) -> bool;
}

/// Retries a fallible async operation on transient failures.
///
/// Attempt `n` (0-based) that fails transiently is followed by a sleep of
/// `base_delay * 2^n`, unless it was the last permitted attempt, in which
/// case the original error is returned unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` is clamped to at least one attempt.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
        )
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep that follows the failed attempt `attempt` (0-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Runs `op` until it succeeds, fails permanently, or the attempt budget
    /// is spent.
    pub async fn execute<T, E, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut attempt = 0;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() {
                tracing::warn!(operation, error = %err, "cache write failed permanently");
                return Err(err);
            }

            tracing::error!(
                operation,
                attempt = attempt + 1,
                max_attempts = self.max_attempts,
                error = %err,
                "cache write failed"
            );

            if attempt + 1 >= self.max_attempts {
                return Err(err);
            }

            metrics::record_write_retry(operation);
            tokio::time::sleep(self.delay_for(attempt)).await;
            attempt += 1;
        }
    }
}
