pub mod batch;
pub mod circuit_breaker;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod fallback;
pub mod models;
pub mod preload;
pub mod retry;
pub mod scheduler;
pub mod service;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
pub mod traits;

pub use batch::{BatchConfig, BatchEvent, BatchFetcher, BatchReporter, TracingBatchReporter};
pub use circuit_breaker::{BreakerMode, CircuitBreaker, CircuitBreakerConfig};
pub use config::ApiConfig;
pub use endpoint::Endpoint;
pub use error::AppError;
pub use fallback::{fallback_recipes, fallback_thumbnails, fill_with_fallback};
pub use models::{Category, Ingredient, Meal, MealSummary};
pub use preload::{ImagePreloader, PreloadStatus, PreloadSummary};
pub use retry::RetryPolicy;
pub use scheduler::{ModeProfile, Scheduler, SchedulerConfig, SchedulerStats};
pub use service::RecipeService;
pub use traits::{Fetcher, ImageLoader, RandomSource};
