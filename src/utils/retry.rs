// src/utils/retry.rs

//! Bounded retry for flaky external calls.

use std::time::Duration;

use crate::error::Result;

/// Retry policy: attempt ceiling, initial delay, backoff multiplier.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: u32,
}

impl RetryPolicy {
    /// Fixed delay between every attempt.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: 1,
        }
    }

    /// Delay multiplied by `backoff` after each failed attempt.
    pub fn backoff(max_attempts: u32, delay: Duration, backoff: u32) -> Self {
        Self {
            max_attempts,
            delay,
            backoff,
        }
    }

    /// Delay to sleep after the given 1-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delay * self.backoff.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Run `op` until it succeeds or the policy's attempt ceiling is reached.
/// The last error is returned on exhaustion.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts => {
                log::warn!(
                    "attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt,
                    policy.max_attempts,
                    e,
                    policy.delay_for(attempt)
                );
                tokio::time::sleep(policy.delay_for(attempt)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
