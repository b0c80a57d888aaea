use std::time::Duration;

use pantry_core::config::ApiConfig;
use pantry_core::error::AppError;
use pantry_core::traits::Fetcher;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};

pub(crate) const USER_AGENT: &str = "Pantry/0.1 (recipe client)";

/// HTTP fetcher for the recipe API using reqwest.
///
/// Returns the raw JSON body. The scheduler above it applies its own
/// deadline; the client timeout here is a backstop for callers that use
/// the fetcher directly.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout: Duration,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(pantry_core::config::DEFAULT_TIMEOUT)
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, AppError> {
        Self::with_timeout(config.timeout)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self { client, timeout })
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, url));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))
    }
}

pub(crate) fn map_transport_error(e: reqwest::Error, timeout: Duration) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(timeout)
    } else if e.is_connect() {
        AppError::NetworkError(format!("Connection failed: {e}"))
    } else {
        AppError::HttpError(e.to_string())
    }
}

pub(crate) fn status_error(status: StatusCode, url: &str) -> AppError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!(%url, "Upstream answered 429");
        AppError::RateLimited
    } else {
        AppError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        }
    }
}
