//! Bounded retry helper for flaky external resources.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Configuration for bounded local retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
    /// Operation name for logging.
    pub operation_name: String,
}

impl RetryConfig {
    /// Create a new retry config with the given operation name.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(2),
            operation_name: operation_name.into(),
        }
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Execute an async operation, retrying only errors the predicate accepts.
///
/// Non-retryable errors are returned immediately; retryable ones are
/// retried up to `max_retries` times with a fixed delay, then the last
/// error is returned.
pub async fn retry_async_if<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation: F,
    retryable: P,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if retryable(&e) && attempt < config.max_retries => {
                attempt += 1;
                debug!(
                    "{} attempt {} failed, retrying in {:?}: {}",
                    config.operation_name, attempt, config.delay, e
                );
                tokio::time::sleep(config.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
