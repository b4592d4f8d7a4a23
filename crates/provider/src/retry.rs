//! Fixed-backoff retry for idempotent provider reads.
//!
//! Only GET requests go through [`retry_idempotent`]. Commands that change
//! provider state (start, send, complete) are sent exactly once.

use std::future::Future;
use std::time::Duration;

use rxentry_core::config::NetworkConfig;

/// Bounded retry parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made after the first one fails.
    pub retries: u32,
    /// Delay between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }

    pub fn from_config(network: &NetworkConfig) -> Self {
        Self {
            retries: network.retry_attempts,
            delay: network.retry_delay,
        }
    }

    /// Upper bound on the number of times an operation is attempted.
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&NetworkConfig::default())
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are exhausted. The last error is returned.
pub async fn retry_idempotent<T, E, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation, attempt, "Provider request succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if is_retryable(&e) && attempt < policy.max_attempts() => {
                tracing::warn!(
                    operation,
                    attempt,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %e,
                    "Provider request failed, retrying",
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
