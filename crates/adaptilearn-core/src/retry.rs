//! Retry wrapper for idempotent store operations.
//!
//! Transient [`StoreError`]s are retried with a fixed delay; permanent ones
//! end the attempts at once. Callers get a [`PersistenceError`] describing
//! how the operation ended.

use std::future::Future;
use std::time::Duration;

use crate::error::{PersistenceError, StoreError};

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Treated as at least 1.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A policy that tries once.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// Run `op` until it succeeds, fails permanently, or runs out of attempts.
///
/// `op` must be safe to repeat: it is called again after every transient
/// failure.
pub async fn retry_idempotent<T, F, Fut>(
    operation: &str,
    policy: RetryPolicy,
    mut op: F,
) -> Result<T, PersistenceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!("{operation} succeeded on attempt {attempt}");
                }
                return Ok(value);
            }
            Err(err) if err.is_permanent() => {
                tracing::warn!("{operation} failed permanently: {err}");
                return Err(PersistenceError::Permanent {
                    operation: operation.to_string(),
                    source: err,
                });
            }
            Err(err) if attempt >= max_attempts => {
                tracing::warn!("{operation} failed after {attempt} attempts: {err}");
                return Err(PersistenceError::Exhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    source: err,
                });
            }
            Err(err) => {
                tracing::warn!(
                    "{operation} attempt {attempt}/{max_attempts} failed: {err}, retrying in {}ms",
                    policy.delay.as_millis()
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
