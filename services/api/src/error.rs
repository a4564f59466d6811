//! Custom error types for the API client

use reqwest::StatusCode;
use thiserror::Error;

/// Custom error type for the API client
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response (unreachable host, reset connection, timeout)
    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The backend answered with a non-2xx status
    #[error("HTTP error! status: {0}")]
    Status(StatusCode),

    /// The response body is not the JSON the call expects
    #[error("Failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request could not be built, e.g. no endpoint is configured
    #[error("Invalid request: {0}")]
    Validation(String),
}

impl ApiError {
    /// HTTP status carried by the error, if the backend answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status(status) => Some(*status),
            ApiError::Transport(e) => e.status(),
            _ => None,
        }
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
