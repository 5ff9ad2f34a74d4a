//! Retry logic for remote listings
//!
//! Transient store errors (anything that is not a configuration error or a
//! failed upload) are retried with exponential backoff: 1s, 2s, 4s, ...
//! The default policy performs no retries at all, so a failing listing
//! aborts the cycle straight away.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};
use upsync_core::ports::StoreError;

/// Base delay for exponential backoff (1 second)
const BASE_DELAY: Duration = Duration::from_secs(1);

/// How often and how patiently an operation is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure
    pub max_retries: u32,
    /// Delay before the first retry; doubled for every further one
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: BASE_DELAY,
        }
    }

    /// Retry up to `max_retries` times with the standard 1s base delay
    #[must_use]
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: BASE_DELAY,
        }
    }

    /// Delay before retry number `attempt` (0-based)
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Determines whether a store error is worth another attempt
fn is_transient_error(err: &StoreError) -> bool {
    !err.is_configuration() && !matches!(err, StoreError::UploadFailed { .. })
}

/// Executes an async store operation with exponential backoff retry
///
/// Non-transient errors and the last failure once retries are exhausted
/// are returned unchanged.
pub async fn with_retry<F, Fut, T>(
    policy: RetryPolicy,
    operation_name: &str,
    f: F,
) -> Result<T, StoreError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(
                        operation = operation_name,
                        attempt, "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if attempt < policy.max_retries && is_transient_error(&err) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
