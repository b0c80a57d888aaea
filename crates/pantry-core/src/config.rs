use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://www.themealdb.com/api/json/v1";
/// TheMealDB's public test key.
pub const DEFAULT_API_KEY: &str = "1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the recipe API lives and how long a single request may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read configuration from environment variables.
    ///
    /// - `MEALDB_BASE_URL` (optional, defaults to the public API)
    /// - `MEALDB_API_KEY` (optional, defaults to the public test key `1`)
    /// - `MEALDB_TIMEOUT_SECS` (optional, defaults to 10)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let base_url = lookup("MEALDB_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_key = lookup("MEALDB_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_KEY.to_string());

        let timeout = match lookup("MEALDB_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT,
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    AppError::ConfigError(format!(
                        "Invalid MEALDB_TIMEOUT_SECS '{raw}': must be a positive integer"
                    ))
                })?;
                Duration::from_secs(secs)
            }
        };

        let config = Self {
            base_url,
            api_key,
            timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject a zero timeout and base URLs that cannot be parsed or are
    /// not http(s).
    pub fn validate(&self) -> Result<(), AppError> {
        if self.timeout.is_zero() {
            return Err(AppError::ConfigError(
                "Request timeout must be at least 1 second".into(),
            ));
        }

        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            AppError::ConfigError(format!("Invalid base URL '{}': {e}", self.base_url))
        })?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(AppError::ConfigError(format!(
                "Base URL scheme '{scheme}' is not allowed (only http/https)"
            ))),
        }
    }

    /// `<base_url>/<api_key>` without a trailing slash.
    pub fn api_root(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_key.trim_matches('/')
        )
    }
}
