//! Engine configuration.

use std::time::Duration;

/// Engine configuration.
///
/// `concurrency` is the number of generation workers; there is no enforced
/// upper bound, useful tokens are the real limiter.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of concurrent generation workers
    pub concurrency: usize,
    /// Terminal failure ceiling: a job failing this many times is marked
    /// failed instead of requeued
    pub max_attempts: u32,
    /// Bounded retries when the browser profile is locked by another process
    pub session_retry_attempts: u32,
    /// Delay between profile-lock retries
    pub session_retry_delay: Duration,
    /// Settle delay after tearing a session down, lets OS file locks clear
    pub settle_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            max_attempts: 5,
            session_retry_attempts: 3,
            session_retry_delay: Duration::from_secs(2),
            settle_delay: Duration::from_millis(1500),
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            concurrency: std::env::var("OPAL_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            max_attempts: std::env::var("OPAL_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            session_retry_attempts: std::env::var("OPAL_SESSION_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            session_retry_delay: Duration::from_millis(
                std::env::var("OPAL_SESSION_RETRY_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
            settle_delay: Duration::from_millis(
                std::env::var("OPAL_SETTLE_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1500),
            ),
        }
    }

    /// Set the worker count.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the per-job attempt ceiling.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}
