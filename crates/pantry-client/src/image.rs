use std::time::Duration;

use pantry_core::error::AppError;
use pantry_core::traits::ImageLoader;
use reqwest::Client;
use url::Url;

use crate::fetcher::{USER_AGENT, map_transport_error, status_error};

/// Downloads thumbnails so later displays hit a warm HTTP cache.
///
/// Image hosts are a separate CDN from the recipe API, so these loads are
/// not routed through the request scheduler.
#[derive(Clone)]
pub struct ReqwestImageLoader {
    client: Client,
    timeout: Duration,
}

impl ReqwestImageLoader {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(15))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self { client, timeout })
    }
}

impl ImageLoader for ReqwestImageLoader {
    async fn load(&self, url: &str) -> Result<(), AppError> {
        let parsed =
            Url::parse(url).map_err(|e| AppError::HttpError(format!("Invalid image URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::HttpError(format!(
                "Image URL scheme '{}' is not allowed (only http/https)",
                parsed.scheme()
            )));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, url));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read image body: {e}")))?;
        tracing::trace!(%url, size = bytes.len(), "Image warmed");
        Ok(())
    }
}
