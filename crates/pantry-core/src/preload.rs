//! Best-effort thumbnail warming.
//!
//! Each URL is loaded at most once at a time: a caller that finds a load
//! already in flight awaits the same shared future instead of starting a
//! second one. Records are kept for the process lifetime, keyed by URL only.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared, join_all};

use crate::models::Meal;
use crate::traits::ImageLoader;

/// Outcome of the most recent load of a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadStatus {
    Pending,
    Loaded,
    Failed,
}

/// Aggregate result of [`ImagePreloader::preload_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadSummary {
    pub loaded: usize,
    pub failed: usize,
}

type SharedLoad = Shared<BoxFuture<'static, bool>>;

enum Entry {
    Pending(SharedLoad),
    Loaded,
    Failed,
}

/// Warms images through an [`ImageLoader`], coalescing duplicate requests.
pub struct ImagePreloader<L> {
    loader: L,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl<L: Clone> Clone for ImagePreloader<L> {
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
            entries: Arc::clone(&self.entries),
        }
    }
}

fn lock_entries(entries: &Mutex<HashMap<String, Entry>>) -> MutexGuard<'_, HashMap<String, Entry>> {
    entries.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Recovered from poisoned preload mutex");
        poisoned.into_inner()
    })
}

impl<L: ImageLoader> ImagePreloader<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn status(&self, url: &str) -> Option<PreloadStatus> {
        lock_entries(&self.entries).get(url).map(|entry| match entry {
            Entry::Pending(_) => PreloadStatus::Pending,
            Entry::Loaded => PreloadStatus::Loaded,
            Entry::Failed => PreloadStatus::Failed,
        })
    }

    /// Warm one image. Returns whether it is now loaded.
    ///
    /// Already-loaded URLs resolve immediately; a previously failed URL is
    /// attempted again.
    pub async fn preload(&self, url: &str) -> bool {
        let load = {
            let mut entries = lock_entries(&self.entries);
            match entries.get(url) {
                Some(Entry::Loaded) => return true,
                Some(Entry::Pending(load)) => load.clone(),
                Some(Entry::Failed) | None => {
                    let load = self.start_load(url);
                    entries.insert(url.to_string(), Entry::Pending(load.clone()));
                    load
                }
            }
        };
        load.await
    }

    fn start_load(&self, url: &str) -> SharedLoad {
        let loader = self.loader.clone();
        let entries = Arc::clone(&self.entries);
        let url = url.to_string();

        async move {
            let loaded = match loader.load(&url).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(%url, error = %e, "Image preload failed");
                    false
                }
            };
            let entry = if loaded { Entry::Loaded } else { Entry::Failed };
            lock_entries(&entries).insert(url, entry);
            loaded
        }
        .boxed()
        .shared()
    }

    /// Warm every distinct URL and wait for all of them, success or not.
    pub async fn preload_all<I, S>(&self, urls: I) -> PreloadSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut distinct = HashSet::new();
        let urls: Vec<String> = urls
            .into_iter()
            .map(|u| u.as_ref().to_string())
            .filter(|u| !u.trim().is_empty() && distinct.insert(u.clone()))
            .collect();

        if urls.is_empty() {
            return PreloadSummary::default();
        }

        tracing::debug!(count = urls.len(), "Preloading images");
        let outcomes = join_all(urls.iter().map(|url| self.preload(url))).await;

        let loaded = outcomes.iter().filter(|ok| **ok).count();
        let summary = PreloadSummary {
            loaded,
            failed: outcomes.len() - loaded,
        };
        tracing::debug!(loaded = summary.loaded, failed = summary.failed, "Image preloading complete");
        summary
    }

    /// Warm the thumbnails of `meals`; meals without one are skipped.
    pub async fn preload_meals(&self, meals: &[Meal]) -> PreloadSummary {
        self.preload_all(meals.iter().filter_map(|m| m.thumbnail.as_deref()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testutil::MockImageLoader;

    const URL: &str = "https://www.themealdb.com/images/media/meals/1.jpg";

    #[tokio::test]
    async fn sequential_preload_loads_once() {
        let loader = MockImageLoader::new();
        let preloader = ImagePreloader::new(loader.clone());

        assert!(preloader.preload(URL).await);
        assert!(preloader.preload(URL).await);

        assert_eq!(loader.loads_for(URL), 1);
        assert_eq!(preloader.status(URL), Some(PreloadStatus::Loaded));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_preload_shares_in_flight_load() {
        let loader = MockImageLoader::new().with_delay(Duration::from_millis(500));
        let preloader = ImagePreloader::new(loader.clone());

        let (a, b) = tokio::join!(preloader.preload(URL), preloader.preload(URL));
        assert!(a && b);
        assert_eq!(loader.loads_for(URL), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_status_is_visible_while_loading() {
        let loader = MockImageLoader::new().with_delay(Duration::from_secs(1));
        let preloader = ImagePreloader::new(loader);

        let background = {
            let preloader = preloader.clone();
            tokio::spawn(async move { preloader.preload(URL).await })
        };
        tokio::task::yield_now().await;

        assert_eq!(preloader.status(URL), Some(PreloadStatus::Pending));
        assert!(background.await.unwrap());
        assert_eq!(preloader.status(URL), Some(PreloadStatus::Loaded));
    }

    #[tokio::test]
    async fn failures_are_isolated_and_retryable() {
        let bad = "https://example.com/missing.jpg";
        let loader = MockImageLoader::new().failing_on(bad);
        let preloader = ImagePreloader::new(loader.clone());

        let summary = preloader.preload_all([URL, bad, URL]).await;
        assert_eq!(summary, PreloadSummary { loaded: 1, failed: 1 });
        assert_eq!(preloader.status(bad), Some(PreloadStatus::Failed));

        assert!(!preloader.preload(bad).await);
        assert_eq!(loader.loads_for(bad), 2);
        assert_eq!(loader.loads_for(URL), 1);
    }

    #[tokio::test]
    async fn empty_input_is_a_no_op() {
        let loader = MockImageLoader::new();
        let preloader = ImagePreloader::new(loader.clone());

        let summary = preloader.preload_all(Vec::<String>::new()).await;
        assert_eq!(summary, PreloadSummary::default());
        assert_eq!(loader.total_loads(), 0);
    }
}
