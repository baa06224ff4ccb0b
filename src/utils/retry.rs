//! Retry utilities for resilient operations
//!
//! This module provides a common retry mechanism with exponential backoff.
//! The kiosk uses it for the ads manifest fetch, whose default schedule is
//! "immediately, then +400ms, then +1200ms".

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (total attempts = max_retries + 1)
    pub max_retries: u32,

    /// Delay in milliseconds before the first retry
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,

    /// Multiplier applied to the delay for each further retry
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 400,
            max_delay_ms: 10_000,
            backoff_multiplier: 3.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom max retries
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Create a retry configuration with custom delays
    pub fn with_delays(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            ..Default::default()
        }
    }

    /// Calculate delay for a given attempt using exponential backoff
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = if attempt == 0 {
            0
        } else {
            let exponential =
                self.base_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
            (exponential as u64).min(self.max_delay_ms)
        };

        Duration::from_millis(delay_ms)
    }

    /// Total number of attempts, including the first one
    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Execute an operation with retry logic and exponential backoff
///
/// Returns `Ok(T)` on the first success, or the last error once every
/// attempt has failed.
///
/// # Example
///
/// ```no_run
/// use filakiosk::utils::retry::{with_retry, RetryConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let config = RetryConfig::default();
///     let result: Result<u32, String> = with_retry(&config, || async { Ok(7) }).await;
///     assert_eq!(result, Ok(7));
/// }
/// ```
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = config.calculate_delay(attempt);
            debug!(
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying operation after delay"
            );
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                warn!(
                    attempt = attempt,
                    max_retries = config.max_retries,
                    error = %e,
                    "Operation failed"
                );
                if attempt >= config.max_retries {
                    return Err(e);
                }
            }
        }

        attempt += 1;
    }
}

/// Like [`with_retry`], but abandons the operation when `cancel` fires
///
/// Returns `None` if the token was cancelled before an attempt completed,
/// including while waiting out a backoff delay.
pub async fn with_retry_cancellable<T, E, F, Fut>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    operation: F,
) -> Option<Result<T, E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Retry loop cancelled");
            None
        }
        result = with_retry(config, operation) => Some(result),
    }
}
