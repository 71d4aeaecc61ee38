use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Retry settings for an external call
///
/// Only transient errors (network, rate limit, timeout) are retried. The
/// delay before attempt `n` is `initial_backoff * 2^(n-1)`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
        }
    }

    /// Never retry
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0;
        loop {
            if attempts > 0 {
                let delay = self.delay_for(attempts);
                info!(
                    operation,
                    attempt = attempts + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying"
                );
                sleep(delay).await;
            }

            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempts < self.max_retries => {
                    warn!(operation, attempt = attempts + 1, error = %e, "Transient failure");
                    attempts += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}
