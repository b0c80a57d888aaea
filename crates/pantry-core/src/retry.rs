//! Bounded retry with exponential backoff around scheduler admissions.

use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::scheduler::{ModeProfile, Scheduler};

/// Retry configuration with exponential backoff.
///
/// After failed attempt `n` (1-indexed) the executor waits `base * 2^n`,
/// where `base` is the active profile's `rate_limit_base` for 429 answers
/// and `retry_base` otherwise. Delays are capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// A single attempt and no backoff, for latency-sensitive calls.
    pub fn fail_fast() -> Self {
        Self::new(1)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after `attempt` failed with `error`.
    pub fn delay_for_attempt(&self, profile: &ModeProfile, attempt: u32, error: &AppError) -> Duration {
        let base = if error.is_rate_limit() {
            profile.rate_limit_base
        } else {
            profile.retry_base
        };
        base.saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// Run `make_call` through the scheduler until it succeeds, fails with a
    /// non-retryable error, or runs out of attempts.
    ///
    /// Exhaustion yields [`AppError::RetriesExhausted`] carrying the last
    /// underlying error.
    pub async fn run<T, F, Fut>(&self, scheduler: &Scheduler, mut make_call: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match scheduler.admit(&mut make_call).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    tracing::warn!(attempts = attempt, error = %e, "Giving up on request");
                    return Err(AppError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.delay_for_attempt(&scheduler.active_profile(), attempt, &e);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = %delay.as_millis(),
                        error = %e,
                        "Request failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
