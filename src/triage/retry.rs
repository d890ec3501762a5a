use crate::config::TriageConfig;
use crate::error::{Result, TriageError};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded exponential backoff for recoverable triage failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TriageConfig::default())
    }
}

/// The last error of a step that was given up on
#[derive(Debug)]
pub struct GaveUp {
    pub attempts: u32,
    pub error: TriageError,
}

impl RetryPolicy {
    #[must_use]
    pub const fn from_config(config: &TriageConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay: Duration::from_millis(config.initial_backoff_ms),
            max_delay: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Policy that never waits, for tests
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based), capped at `max_delay`
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.min(32)).unwrap_or(32);
        self.initial_delay
            .mul_f64(2_f64.powi(exponent))
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non-recoverable error, or
    /// `max_attempts` is reached
    pub async fn run<T, F, Fut>(&self, step: &str, mut op: F) -> std::result::Result<T, GaveUp>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_recoverable() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        step,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "Triage step failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                },
                Err(error) => {
                    return Err(GaveUp {
                        attempts: attempt,
                        error,
                    });
                },
            }
        }
    }
}

/// Bound a future by `limit`, reporting `operation` on expiry
pub async fn with_deadline<T, Fut>(operation: &str, limit: Duration, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| TriageError::Timeout {
            operation: operation.to_string(),
            millis: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        })?
}
