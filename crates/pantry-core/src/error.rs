use std::time::Duration;

use thiserror::Error;

/// Application-wide error types for Pantry.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP client construction or body read failed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The API answered with a non-success status other than 429.
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// The API answered 429 Too Many Requests.
    #[error("Rate limited by upstream API")]
    RateLimited,

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Request did not finish within its deadline.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Every attempt of a retried call failed.
    #[error("Request failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<AppError>,
    },

    /// A batch fetch collected nothing before its attempt budget ran out.
    #[error("Could not fetch any recipes after {attempts} attempt(s)")]
    EmptyBatch { attempts: u32 },

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_)
            | AppError::Timeout(_)
            | AppError::RateLimited
            | AppError::HttpStatus { .. } => true,
            AppError::HttpError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }

    /// Returns true if the upstream explicitly asked us to slow down.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            AppError::RateLimited => true,
            AppError::RetriesExhausted { source, .. } => source.is_rate_limit(),
            _ => false,
        }
    }

    /// Returns true if this error should push the circuit breaker toward safe mode.
    pub fn should_trip_circuit(&self) -> bool {
        matches!(self, AppError::RateLimited)
    }

    /// Returns true for the failures a user should be offered a retry for.
    pub fn is_user_retryable(&self) -> bool {
        matches!(
            self,
            AppError::EmptyBatch { .. } | AppError::RetriesExhausted { .. }
        )
    }
}
