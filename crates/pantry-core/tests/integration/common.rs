use std::sync::Arc;
use std::time::Duration;

use pantry_core::testutil::MockFetcher;
use pantry_core::{ApiConfig, AppError, RecipeService, RetryPolicy, Scheduler, SchedulerConfig};

pub fn service_with(fetcher: MockFetcher, config: SchedulerConfig) -> RecipeService<MockFetcher> {
    RecipeService::new(fetcher, ApiConfig::default(), Arc::new(Scheduler::new(config)))
}

/// Service on the default scheduler, one attempt per call.
pub fn single_shot_service(fetcher: MockFetcher) -> RecipeService<MockFetcher> {
    service_with(fetcher, SchedulerConfig::default()).with_retry(RetryPolicy::fail_fast())
}

/// Force the breaker deep enough into safe mode that a handful of
/// successes will not bring it back.
pub fn trip_breaker(service: &RecipeService<MockFetcher>, failures: u32) {
    for _ in 0..failures {
        service
            .scheduler()
            .breaker()
            .record_failure(&AppError::RateLimited);
    }
}

pub const SLOW_CALL: Duration = Duration::from_secs(2);
