//! Success-decayed circuit breaker ("safe mode").
//!
//! Unlike a classic open/half-open breaker, this one never rejects calls.
//! It tracks a rolling error counter and tells the scheduler which
//! [`ModeProfile`](crate::scheduler::ModeProfile) to apply.
//!
//! # Modes
//!
//! ```text
//! NORMAL --[errors >= threshold]--> SAFE
//!   ^                                 |
//!   +-----[success decrements below]--+
//! ```
//!
//! There is no cool-down timer: recovery is driven purely by observed
//! successes, so capacity follows what the upstream actually tolerates.

use std::sync::{Arc, Mutex};

use crate::error::AppError;

/// Current mode of the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerMode {
    /// Normal concurrency and pacing.
    Normal,
    /// Strictly serial, slower pacing, wider retry backoff.
    Safe,
}

impl std::fmt::Display for BreakerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerMode::Normal => write!(f, "normal"),
            BreakerMode::Safe => write!(f, "safe"),
        }
    }
}

/// Configuration for circuit breaker behavior.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Error count at which the breaker enters safe mode.
    pub failure_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
        }
    }
}

#[derive(Debug, Default)]
struct CircuitBreakerInner {
    error_count: u32,
    last_error_message: Option<String>,
}

/// Statistics about circuit breaker state for monitoring.
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub name: String,
    pub mode: BreakerMode,
    pub error_count: u32,
    pub last_error: Option<String>,
}

/// Thread-safe error counter that selects normal or safe mode.
#[derive(Clone)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<CircuitBreakerInner>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Arc::new(Mutex::new(CircuitBreakerInner::default())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquires the inner mutex lock, recovering from poison if necessary.
    fn lock_inner(&self) -> std::sync::MutexGuard<'_, CircuitBreakerInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(circuit = %self.name, "Recovered from poisoned mutex");
            poisoned.into_inner()
        })
    }

    fn mode_for(&self, error_count: u32) -> BreakerMode {
        if error_count >= self.config.failure_threshold {
            BreakerMode::Safe
        } else {
            BreakerMode::Normal
        }
    }

    pub fn mode(&self) -> BreakerMode {
        let inner = self.lock_inner();
        self.mode_for(inner.error_count)
    }

    pub fn error_count(&self) -> u32 {
        self.lock_inner().error_count
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.lock_inner();
        CircuitBreakerStats {
            name: self.name.clone(),
            mode: self.mode_for(inner.error_count),
            error_count: inner.error_count,
            last_error: inner.last_error_message.clone(),
        }
    }

    /// Decrement the error counter (floored at zero).
    pub fn record_success(&self) {
        let mut inner = self.lock_inner();
        if inner.error_count == 0 {
            return;
        }

        let before = self.mode_for(inner.error_count);
        inner.error_count -= 1;
        if before == BreakerMode::Safe && self.mode_for(inner.error_count) == BreakerMode::Normal {
            tracing::info!(
                circuit = %self.name,
                error_count = inner.error_count,
                "Leaving safe mode after successful request"
            );
            inner.last_error_message = None;
        }
    }

    /// Count a failure if it signals upstream pressure; other failures are ignored.
    pub fn record_failure(&self, error: &AppError) {
        if !error.should_trip_circuit() {
            return;
        }

        let mut inner = self.lock_inner();
        let before = self.mode_for(inner.error_count);
        inner.error_count = inner.error_count.saturating_add(1);
        inner.last_error_message = Some(error.to_string());

        tracing::warn!(
            circuit = %self.name,
            error_count = inner.error_count,
            "Rate limited by upstream"
        );

        if before == BreakerMode::Normal && self.mode_for(inner.error_count) == BreakerMode::Safe {
            tracing::warn!(
                circuit = %self.name,
                error_count = inner.error_count,
                "Entering safe mode: serialising requests"
            );
        }
    }

    pub fn reset(&self) {
        let mut inner = self.lock_inner();
        tracing::info!(circuit = %self.name, "Circuit breaker manually reset");
        inner.error_count = 0;
        inner.last_error_message = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_threshold: threshold,
            },
        )
    }

    #[test]
    fn test_breaker_starts_normal() {
        let cb = CircuitBreaker::new("test", CircuitBreakerConfig::default());
        assert_eq!(cb.mode(), BreakerMode::Normal);
        assert_eq!(cb.error_count(), 0);
    }

    #[test]
    fn test_enters_safe_mode_at_threshold() {
        let cb = breaker(3);
        cb.record_failure(&AppError::RateLimited);
        cb.record_failure(&AppError::RateLimited);
        assert_eq!(cb.mode(), BreakerMode::Normal);

        cb.record_failure(&AppError::RateLimited);
        assert_eq!(cb.mode(), BreakerMode::Safe);
        assert!(cb.stats().last_error.is_some());
    }

    #[test]
    fn test_non_rate_limit_failures_do_not_count() {
        let cb = breaker(1);
        cb.record_failure(&AppError::NetworkError("down".into()));
        cb.record_failure(&AppError::Timeout(std::time::Duration::from_secs(10)));
        assert_eq!(cb.error_count(), 0);
        assert_eq!(cb.mode(), BreakerMode::Normal);
    }

    #[test]
    fn test_success_decays_counter_and_recovers() {
        let cb = breaker(3);
        for _ in 0..4 {
            cb.record_failure(&AppError::RateLimited);
        }
        assert_eq!(cb.error_count(), 4);

        cb.record_success();
        assert_eq!(cb.error_count(), 3);
        assert_eq!(cb.mode(), BreakerMode::Safe);

        cb.record_success();
        assert_eq!(cb.error_count(), 2);
        assert_eq!(cb.mode(), BreakerMode::Normal);
        assert!(cb.stats().last_error.is_none());
    }

    #[test]
    fn test_counter_floors_at_zero() {
        let cb = breaker(3);
        cb.record_success();
        cb.record_success();
        assert_eq!(cb.error_count(), 0);
    }

    #[test]
    fn test_manual_reset() {
        let cb = breaker(1);
        cb.record_failure(&AppError::RateLimited);
        assert_eq!(cb.mode(), BreakerMode::Safe);

        cb.reset();
        assert_eq!(cb.mode(), BreakerMode::Normal);
        assert_eq!(cb.error_count(), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let cb = breaker(2);
        let other = cb.clone();
        other.record_failure(&AppError::RateLimited);
        other.record_failure(&AppError::RateLimited);
        assert_eq!(cb.mode(), BreakerMode::Safe);
        assert_eq!(cb.name(), "test");
    }
}
