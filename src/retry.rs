//! Bounded retry with exponential backoff for external calls.
//!
//! Every generation and synthesis call goes through [`RetryPolicy::run`]: each
//! attempt gets its own timeout, transient failures are retried after a capped
//! exponential delay, and non-transient failures are returned immediately.

use crate::config::{LongFormSettings, TtsSettings};
use crate::error::{PodweaveError, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Retry configuration for one kind of external call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Timeout applied to each individual attempt.
    pub call_timeout: Duration,
}

/// The error that ended a retried call, with the number of attempts made.
#[derive(Debug)]
pub struct RetryFailure {
    pub attempts: u32,
    pub error: PodweaveError,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration, call_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            call_timeout,
        }
    }

    /// Delay before retrying after the given zero-based attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.min(31);
        let multiplier = 1u32.checked_shl(shift).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(multiplier).min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails non-transiently, or attempts run out.
    ///
    /// `op` receives the zero-based attempt number.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> std::result::Result<T, RetryFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(RetryFailure {
                    attempts: attempt,
                    error: PodweaveError::Cancelled(label.to_string()),
                });
            }

            let outcome = match tokio::time::timeout(self.call_timeout, op(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(PodweaveError::Timeout(self.call_timeout)),
            };
            attempt += 1;

            let error = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !error.is_transient() || attempt >= self.max_attempts {
                return Err(RetryFailure { attempts: attempt, error });
            }

            let delay = self.delay_for(attempt - 1);
            warn!(
                "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                label, attempt, self.max_attempts, error, delay
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(RetryFailure {
                        attempts: attempt,
                        error: PodweaveError::Cancelled(label.to_string()),
                    });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

impl From<&LongFormSettings> for RetryPolicy {
    fn from(settings: &LongFormSettings) -> Self {
        Self::new(
            settings.max_retries,
            Duration::from_millis(settings.retry_base_delay_ms),
            Duration::from_millis(settings.retry_max_delay_ms),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }
}

impl From<&TtsSettings> for RetryPolicy {
    fn from(settings: &TtsSettings) -> Self {
        Self::new(
            settings.max_retries,
            Duration::from_millis(settings.retry_base_delay_ms),
            Duration::from_millis(settings.retry_max_delay_ms),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }
}
