//! PostgREST error types.

use thiserror::Error;

/// Result type for PostgREST operations.
pub type PostgrestResult<T> = Result<T, PostgrestError>;

/// Default wait when a 429 carries no usable Retry-After header.
const DEFAULT_RETRY_AFTER_MS: u64 = 1000;

/// Errors that can occur while talking to PostgREST.
#[derive(Debug, Error)]
pub enum PostgrestError {
    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Row not found: {0}")]
    NotFound(String),

    #[error("Row already exists: {0}")]
    AlreadyExists(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PostgrestError {
    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::NotConfigured(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_http_status(status: u16, msg: impl Into<String>) -> Self {
        Self::from_http_parts(status, None, msg)
    }

    /// Map a non-success HTTP status, honoring a Retry-After delay on 429.
    pub fn from_http_parts(status: u16, retry_after_ms: Option<u64>, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        match status {
            404 => Self::NotFound(msg),
            409 => Self::AlreadyExists(msg),
            429 => Self::RateLimited(retry_after_ms.unwrap_or(DEFAULT_RETRY_AFTER_MS)),
            500..=599 => Self::ServerError(status, msg),
            _ => Self::RequestFailed(msg),
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PostgrestError::Network(_) | PostgrestError::RateLimited(_) | PostgrestError::ServerError(..)
        )
    }

    /// Server-requested wait before retrying.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            PostgrestError::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }

    /// HTTP status this error corresponds to, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            PostgrestError::NotFound(_) => Some(404),
            PostgrestError::AlreadyExists(_) => Some(409),
            PostgrestError::RateLimited(_) => Some(429),
            PostgrestError::ServerError(status, _) => Some(*status),
            PostgrestError::RequestFailed(_) => Some(400),
            PostgrestError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
