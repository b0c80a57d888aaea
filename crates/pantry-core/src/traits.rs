use std::future::Future;

use crate::error::AppError;
use crate::models::Meal;

/// Performs one GET against the recipe API and returns the raw JSON body.
///
/// Implementations map HTTP 429 to [`AppError::RateLimited`], other
/// non-success statuses to [`AppError::HttpStatus`], and transport failures
/// to [`AppError::NetworkError`] / [`AppError::Timeout`].
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Downloads an image so that later displays of it are served warm.
pub trait ImageLoader: Send + Sync + Clone + 'static {
    fn load(&self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Yields one random recipe per call.
///
/// `Ok(None)` means the API answered but carried no record.
pub trait RandomSource: Send + Sync {
    fn random_meal(&self) -> impl Future<Output = Result<Option<Meal>, AppError>> + Send;
}
