//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit and integration tests.
//! All mocks use `Arc<Mutex<_>>` or atomics for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::batch::{BatchEvent, BatchReporter};
use crate::error::AppError;
use crate::models::Meal;
use crate::traits::{Fetcher, ImageLoader, RandomSource};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A minimal recipe with the given id and a thumbnail derived from it.
pub fn make_test_meal(id: &str) -> Meal {
    serde_json::from_value(meal_json(id)).unwrap_or_else(|e| panic!("invalid fixture: {e}"))
}

/// The API's JSON shape for a minimal recipe.
pub fn meal_json(id: &str) -> serde_json::Value {
    serde_json::json!({
        "idMeal": id,
        "strMeal": format!("Recipe {id}"),
        "strMealThumb": format!("https://www.themealdb.com/images/media/meals/{id}.jpg"),
        "strCategory": "Test",
        "strArea": "Nowhere",
        "strIngredient1": "salt",
        "strMeasure1": "a pinch"
    })
}

/// `{"meals": [<meal id>]}` as a response body.
pub fn meals_body(ids: &[&str]) -> String {
    let meals: Vec<_> = ids.iter().map(|id| meal_json(id)).collect();
    serde_json::json!({ "meals": meals }).to_string()
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Tracks how many calls are inside the mock at once.
#[derive(Clone, Default)]
struct ConcurrencyProbe {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

struct ProbeGuard(Arc<AtomicUsize>);

impl ConcurrencyProbe {
    fn enter(&self) -> ProbeGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ProbeGuard(Arc::clone(&self.current))
    }
}

impl Drop for ProbeGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock fetcher that returns queued responses.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns `default_body`.
    responses: Arc<Mutex<VecDeque<Result<String, AppError>>>>,
    default_body: Arc<String>,
    delay: Duration,
    requests: Arc<Mutex<Vec<String>>>,
    probe: ConcurrencyProbe,
}

impl MockFetcher {
    pub fn new(body: &str) -> Self {
        Self::with_responses(Vec::new()).with_default_body(body)
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            default_body: Arc::new(r#"{"meals": null}"#.to_string()),
            delay: Duration::ZERO,
            requests: Arc::new(Mutex::new(Vec::new())),
            probe: ConcurrencyProbe::default(),
        }
    }

    pub fn with_default_body(mut self, body: &str) -> Self {
        self.default_body = Arc::new(body.to_string());
        self
    }

    /// Every call takes this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Highest number of calls that were in flight at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.probe.peak.load(Ordering::SeqCst)
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.requests.lock().unwrap().push(url.to_string());
        let _guard = self.probe.enter();

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.default_body.as_ref().clone()))
    }
}

// ---------------------------------------------------------------------------
// MockImageLoader
// ---------------------------------------------------------------------------

/// Mock image loader that counts loads per URL.
#[derive(Clone, Default)]
pub struct MockImageLoader {
    loads: Arc<Mutex<HashMap<String, usize>>>,
    failing: Arc<HashSet<String>>,
    delay: Duration,
}

impl MockImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Loads of `url` always fail.
    pub fn failing_on(mut self, url: &str) -> Self {
        let mut failing = (*self.failing).clone();
        failing.insert(url.to_string());
        self.failing = Arc::new(failing);
        self
    }

    pub fn loads_for(&self, url: &str) -> usize {
        self.loads.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_loads(&self) -> usize {
        self.loads.lock().unwrap().values().sum()
    }
}

impl ImageLoader for MockImageLoader {
    async fn load(&self, url: &str) -> Result<(), AppError> {
        *self.loads.lock().unwrap().entry(url.to_string()).or_default() += 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failing.contains(url) {
            Err(AppError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// MockRandomSource
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum RandomScript {
    Queue(Arc<Mutex<VecDeque<Result<Option<Meal>, AppError>>>>),
    Cycle(Arc<Vec<String>>),
    AlwaysFail,
}

/// Mock random-recipe source with scripted answers.
#[derive(Clone)]
pub struct MockRandomSource {
    script: RandomScript,
    calls: Arc<AtomicUsize>,
}

impl MockRandomSource {
    /// Answers in order; once exhausted every call returns `Ok(None)`.
    pub fn with_responses(responses: Vec<Result<Option<Meal>, AppError>>) -> Self {
        Self {
            script: RandomScript::Queue(Arc::new(Mutex::new(responses.into()))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns recipes with these ids, repeating the cycle forever.
    pub fn cycling(ids: &[&str]) -> Self {
        Self {
            script: RandomScript::Cycle(Arc::new(ids.iter().map(|s| s.to_string()).collect())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every call fails with a network error.
    pub fn always_failing() -> Self {
        Self {
            script: RandomScript::AlwaysFail,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RandomSource for MockRandomSource {
    async fn random_meal(&self) -> Result<Option<Meal>, AppError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            RandomScript::Queue(queue) => queue.lock().unwrap().pop_front().unwrap_or(Ok(None)),
            RandomScript::Cycle(ids) if ids.is_empty() => Ok(None),
            RandomScript::Cycle(ids) => Ok(Some(make_test_meal(&ids[call % ids.len()]))),
            RandomScript::AlwaysFail => Err(AppError::NetworkError("connection refused".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock batch reporter that records event labels.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BatchReporter for MockReporter {
    fn report(&self, event: BatchEvent<'_>) {
        let label = match &event {
            BatchEvent::Started { .. } => "Started",
            BatchEvent::Attempt { .. } => "Attempt",
            BatchEvent::Accepted { .. } => "Accepted",
            BatchEvent::Duplicate { .. } => "Duplicate",
            BatchEvent::Missing { .. } => "Missing",
            BatchEvent::Failed { .. } => "Failed",
            BatchEvent::Finished { .. } => "Finished",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}
