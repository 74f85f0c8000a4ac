//! REST error types

use thiserror::Error;

/// Errors that can occur when talking to the Connected Systems API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Server unreachable
    #[error("Server unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    /// Create call succeeded but returned no `Location` header
    #[error("Server response has no Location header")]
    MissingLocation,

    /// Link or endpoint that is not a valid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to encode or decode body: {0}")]
    Parse(String),
}

impl ApiError {
    /// Whether this is a non-success HTTP status (recoverable for discovery)
    pub fn is_status(&self) -> bool {
        matches!(self, ApiError::Status { .. })
    }

    pub(crate) fn from_send(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_connect() {
            ApiError::Unavailable
        } else {
            ApiError::Request(e)
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}

/// Result type alias for REST operations
pub type ApiResult<T> = Result<T, ApiError>;
