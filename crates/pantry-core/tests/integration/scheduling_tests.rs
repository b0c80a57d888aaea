use std::time::Duration;

use tokio::time::Instant;

use pantry_core::testutil::{MockFetcher, meals_body};
use pantry_core::{AppError, BreakerMode, RetryPolicy, SchedulerConfig};

use crate::common::{SLOW_CALL, service_with, single_shot_service, trip_breaker};

#[tokio::test(start_paused = true)]
async fn normal_mode_caps_in_flight_calls_at_two() {
    let fetcher = MockFetcher::new(&meals_body(&["1"])).with_delay(SLOW_CALL);
    let svc = single_shot_service(fetcher.clone());

    let calls = (0..6).map(|i| {
        let svc = svc.clone();
        tokio::spawn(async move { svc.lookup(&i.to_string()).await })
    });
    for handle in calls.collect::<Vec<_>>() {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(fetcher.request_count(), 6);
    assert_eq!(fetcher.peak_concurrency(), 2);
    assert_eq!(svc.scheduler().snapshot().in_flight, 0);
}

#[tokio::test(start_paused = true)]
async fn safe_mode_runs_calls_one_at_a_time() {
    let fetcher = MockFetcher::new(&meals_body(&["1"])).with_delay(SLOW_CALL);
    let svc = single_shot_service(fetcher.clone());
    trip_breaker(&svc, 10);
    assert_eq!(svc.scheduler().snapshot().mode, BreakerMode::Safe);

    let calls: Vec<_> = (0..4)
        .map(|_| {
            let svc = svc.clone();
            tokio::spawn(async move { svc.random().await })
        })
        .collect();
    for handle in calls {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(fetcher.peak_concurrency(), 1);
    // Four successes walked the counter down but not below the threshold.
    assert_eq!(svc.scheduler().snapshot().error_count, 6);
}

#[tokio::test(start_paused = true)]
async fn call_starts_are_spaced_by_min_interval() {
    let svc = single_shot_service(MockFetcher::new(&meals_body(&["1"])));

    let start = Instant::now();
    for _ in 0..3 {
        svc.random().await.unwrap();
    }

    assert!(start.elapsed() >= Duration::from_millis(1600));
}

#[tokio::test(start_paused = true)]
async fn repeated_rate_limits_enter_and_recovery_leaves_safe_mode() {
    let fetcher = MockFetcher::with_responses(vec![
        Err(AppError::RateLimited),
        Err(AppError::RateLimited),
        Err(AppError::RateLimited),
    ])
    .with_default_body(&meals_body(&["9"]));
    let svc = single_shot_service(fetcher);

    for _ in 0..3 {
        let err = svc.random().await.unwrap_err();
        assert!(err.is_rate_limit());
        assert!(err.is_user_retryable());
    }
    let stats = svc.scheduler().snapshot();
    assert_eq!(stats.mode, BreakerMode::Safe);
    assert_eq!(stats.effective_concurrency, 1);
    assert_eq!(stats.effective_min_interval, Duration::from_millis(1200));

    svc.random().await.unwrap();
    let stats = svc.scheduler().snapshot();
    assert_eq!(stats.mode, BreakerMode::Normal);
    assert_eq!(stats.error_count, 2);
}

#[tokio::test(start_paused = true)]
async fn hung_call_times_out_and_releases_its_slot() {
    let fetcher = MockFetcher::new(&meals_body(&["1"])).with_delay(Duration::from_secs(60));
    let svc = service_with(
        fetcher.clone(),
        SchedulerConfig::default().with_request_timeout(Duration::from_secs(10)),
    )
    .with_retry(RetryPolicy::new(2));

    let start = Instant::now();
    let err = svc.lookup("1").await.unwrap_err();

    match err {
        AppError::RetriesExhausted { attempts, source } => {
            assert_eq!(attempts, 2);
            assert!(matches!(*source, AppError::Timeout(d) if d == Duration::from_secs(10)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fetcher.request_count(), 2);
    // Two 10s timeouts plus a 2s backoff; timeouts do not trip the breaker.
    assert!(start.elapsed() >= Duration::from_secs(22));
    assert_eq!(svc.scheduler().snapshot().in_flight, 0);
    assert_eq!(svc.scheduler().snapshot().mode, BreakerMode::Normal);
}

#[tokio::test(start_paused = true)]
async fn backoff_gaps_grow_until_success() {
    let fetcher = MockFetcher::with_responses(vec![
        Err(AppError::NetworkError("reset".into())),
        Err(AppError::NetworkError("reset".into())),
    ])
    .with_default_body(&meals_body(&["3"]));
    let svc = service_with(fetcher.clone(), SchedulerConfig::default());

    let start = Instant::now();
    let meal = svc.lookup("3").await.unwrap().unwrap();

    assert_eq!(meal.id, "3");
    assert_eq!(fetcher.request_count(), 3);
    // 1s base: 2s after the first failure, 4s after the second.
    assert!(start.elapsed() >= Duration::from_secs(6));
    assert!(start.elapsed() < Duration::from_secs(7));
}
