use std::collections::HashSet;

use pantry_core::testutil::{MockFetcher, MockImageLoader, meals_body};
use pantry_core::{
    AppError, BatchConfig, BatchFetcher, ImagePreloader, PreloadStatus, fill_with_fallback,
};

use crate::common::single_shot_service;

#[tokio::test(start_paused = true)]
async fn batch_over_the_api_skips_duplicates_and_failures() {
    let fetcher = MockFetcher::with_responses(vec![
        Ok(meals_body(&["1"])),
        Ok(meals_body(&["1"])),
        Err(AppError::RateLimited),
        Ok(r#"{"meals": null}"#.to_string()),
        Ok(meals_body(&["2"])),
        Ok(meals_body(&["3"])),
    ]);
    let svc = single_shot_service(fetcher.clone());
    let batch = BatchFetcher::new(svc, BatchConfig::default());

    let items = batch.fetch_unique_batch(3).await.unwrap();

    let ids: Vec<_> = items.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(fetcher.request_count(), 6);
    assert!(
        fetcher
            .requests()
            .iter()
            .all(|url| url.ends_with("/random.php"))
    );
}

#[tokio::test(start_paused = true)]
async fn batch_respects_attempt_budget() {
    let fetcher = MockFetcher::new(&meals_body(&["same"]));
    let svc = single_shot_service(fetcher.clone());
    let batch = BatchFetcher::new(svc, BatchConfig::default());

    let items = batch.fetch_unique_batch(4).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(fetcher.request_count(), 8);
}

#[tokio::test(start_paused = true)]
async fn empty_batch_can_be_replaced_by_fallback() {
    let fetcher = MockFetcher::with_responses(
        (0..4).map(|_| Err(AppError::NetworkError("offline".into()))).collect(),
    );
    let batch = BatchFetcher::new(single_shot_service(fetcher), BatchConfig::default());

    let err = batch.fetch_unique_batch(2).await.unwrap_err();
    assert!(matches!(err, AppError::EmptyBatch { attempts: 4 }));
    assert!(err.is_user_retryable());

    let mut items = Vec::new();
    fill_with_fallback(&mut items, 2);
    let ids: HashSet<_> = items.iter().map(|m| m.id.clone()).collect();
    assert_eq!(ids.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn fetched_batch_thumbnails_are_warmed_once() {
    let fetcher = MockFetcher::with_responses(vec![
        Ok(meals_body(&["10"])),
        Ok(meals_body(&["11"])),
    ]);
    let batch = BatchFetcher::new(single_shot_service(fetcher), BatchConfig::default());
    let loader = MockImageLoader::new();
    let preloader = ImagePreloader::new(loader.clone());

    let (items, summary) = batch.fetch_and_preload(2, &preloader).await.unwrap();
    assert_eq!(summary.loaded, 2);

    // A second pass over the same meals is served from the preload record.
    let again = preloader.preload_meals(&items).await;
    assert_eq!(again.loaded, 2);
    assert_eq!(loader.total_loads(), 2);
    for meal in &items {
        let url = meal.thumbnail.as_deref().unwrap();
        assert_eq!(preloader.status(url), Some(PreloadStatus::Loaded));
    }
}
