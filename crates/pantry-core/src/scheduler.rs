//! Process-wide request gate with bounded concurrency and start-to-start pacing.
//!
//! Every call to the recipe API goes through one shared [`Scheduler`]. It
//! admits at most `concurrency_limit` calls at once (excess demand waits in
//! FIFO order), spaces call *starts* at least `min_interval` apart, bounds
//! each call with a timeout, and feeds outcomes into a [`CircuitBreaker`]
//! whose mode selects which [`ModeProfile`] the next admission uses.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pantry_core::scheduler::{Scheduler, SchedulerConfig};
//!
//! # async fn run() -> Result<(), pantry_core::error::AppError> {
//! let scheduler = Arc::new(Scheduler::new(SchedulerConfig::default()));
//! let body = scheduler
//!     .admit(|| async { Ok::<_, pantry_core::error::AppError>("{}".to_string()) })
//!     .await?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;

use crate::circuit_breaker::{BreakerMode, CircuitBreaker, CircuitBreakerConfig};
use crate::config::DEFAULT_TIMEOUT;
use crate::error::AppError;

/// The knobs that differ between normal and safe mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeProfile {
    /// Maximum number of calls in flight at once.
    pub concurrency_limit: usize,
    /// Minimum gap between two consecutive call starts.
    pub min_interval: Duration,
    /// Backoff base for generic retryable failures.
    pub retry_base: Duration,
    /// Backoff base after the upstream answered 429.
    pub rate_limit_base: Duration,
}

impl ModeProfile {
    pub fn normal() -> Self {
        Self {
            concurrency_limit: 2,
            min_interval: Duration::from_millis(800),
            retry_base: Duration::from_secs(1),
            rate_limit_base: Duration::from_secs(2),
        }
    }

    pub fn safe() -> Self {
        Self {
            concurrency_limit: 1,
            min_interval: Duration::from_millis(1200),
            retry_base: Duration::from_millis(1500),
            rate_limit_base: Duration::from_secs(3),
        }
    }
}

/// Configuration for the scheduler and its breaker.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub normal: ModeProfile,
    pub safe: ModeProfile,
    /// Deadline for a single call once it has been admitted.
    pub request_timeout: Duration,
    pub breaker: CircuitBreakerConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            normal: ModeProfile::normal(),
            safe: ModeProfile::safe(),
            request_timeout: DEFAULT_TIMEOUT,
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn with_normal(mut self, profile: ModeProfile) -> Self {
        self.normal = profile;
        self
    }

    pub fn with_safe(mut self, profile: ModeProfile) -> Self {
        self.safe = profile;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.breaker.failure_threshold = threshold;
        self
    }
}

/// Point-in-time view of the scheduler for monitoring and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    pub mode: BreakerMode,
    pub error_count: u32,
    pub in_flight: usize,
    pub effective_concurrency: usize,
    pub effective_min_interval: Duration,
}

/// Bounded-concurrency, paced request gate.
///
/// Construct once at startup and share it (`Arc<Scheduler>`) with every
/// call site. Slots are semaphore permits sized to the normal-mode limit; a
/// call admitted under a tighter profile takes proportionally more permits,
/// so safe-mode calls run alone. Tokio's semaphore is fair, which keeps
/// admission FIFO.
pub struct Scheduler {
    config: SchedulerConfig,
    slots: Semaphore,
    total_permits: usize,
    last_start: Mutex<Option<Instant>>,
    in_flight: AtomicUsize,
    breaker: CircuitBreaker,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let total_permits = config.normal.concurrency_limit.max(1);
        let breaker = CircuitBreaker::new("mealdb", config.breaker.clone());
        Self {
            config,
            slots: Semaphore::new(total_permits),
            total_permits,
            last_start: Mutex::new(None),
            in_flight: AtomicUsize::new(0),
            breaker,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The profile the breaker currently selects.
    pub fn active_profile(&self) -> ModeProfile {
        match self.breaker.mode() {
            BreakerMode::Normal => self.config.normal,
            BreakerMode::Safe => self.config.safe,
        }
    }

    /// Concurrency a profile actually gets out of the shared permit pool.
    fn permit_weight(&self, profile: &ModeProfile) -> usize {
        let limit = profile.concurrency_limit.clamp(1, self.total_permits);
        self.total_permits.div_ceil(limit)
    }

    fn effective_concurrency(&self, profile: &ModeProfile) -> usize {
        self.total_permits / self.permit_weight(profile)
    }

    pub fn snapshot(&self) -> SchedulerStats {
        let stats = self.breaker.stats();
        let profile = self.active_profile();
        SchedulerStats {
            mode: stats.mode,
            error_count: stats.error_count,
            in_flight: self.in_flight.load(Ordering::SeqCst),
            effective_concurrency: self.effective_concurrency(&profile),
            effective_min_interval: profile.min_interval,
        }
    }

    /// Run one network call once a slot is free and pacing allows it.
    ///
    /// The slot is released on every exit path, including timeout and the
    /// caller dropping this future.
    pub async fn admit<T, F, Fut>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let _permit = self.acquire_start().await?;

        let _in_flight = InFlight::enter(&self.in_flight);
        let timeout = self.config.request_timeout;
        let result = match tokio::time::timeout(timeout, op()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_ms = %timeout.as_millis(), "Request timed out");
                Err(AppError::Timeout(timeout))
            }
        };

        match &result {
            Ok(_) => self.breaker.record_success(),
            Err(e) => self.breaker.record_failure(e),
        }

        result
    }

    /// Take enough permits for the active profile and wait out pacing.
    ///
    /// The breaker may trip while a call is queued or pacing. The weight is
    /// checked again right before the start is recorded; if the call now
    /// needs more permits than it holds, it gives them back and queues
    /// again. Permits are never topped up in place: two callers holding one
    /// permit each would wait on each other.
    async fn acquire_start(&self) -> Result<SemaphorePermit<'_>, AppError> {
        loop {
            let weight = self.permit_weight(&self.active_profile());
            let permit = self
                .slots
                .acquire_many(weight as u32)
                .await
                .map_err(|_| AppError::Generic("request scheduler is closed".into()))?;

            let mut last = self.last_start.lock().await;
            self.wait_for_pacing(&last, self.active_profile().min_interval)
                .await;

            if self.permit_weight(&self.active_profile()) > weight {
                tracing::debug!(weight, "Safe mode entered while queued, re-queueing");
                continue;
            }

            *last = Some(Instant::now());
            return Ok(permit);
        }
    }

    /// Sleep until `min_interval` has passed since the previous call start.
    ///
    /// The caller holds the pacing lock while sleeping so that starts are
    /// spaced globally, in admission order.
    async fn wait_for_pacing(&self, last: &Option<Instant>, min_interval: Duration) {
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < min_interval {
                let sleep_duration = min_interval - elapsed;
                tracing::debug!(
                    sleep_ms = %sleep_duration.as_millis(),
                    "Pacing request"
                );
                tokio::time::sleep(sleep_duration).await;
            }
        }
    }
}

/// Counts a call as in flight for as long as the guard lives.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
