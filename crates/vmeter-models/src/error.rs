//! Model validation errors.

use thiserror::Error;

/// Result type for model construction.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or validating model values.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid tolerance: {0}")]
    InvalidTolerance(String),

    #[error("Invalid preset: {0}")]
    InvalidPreset(String),
}

impl ModelError {
    pub fn invalid_preset(msg: impl Into<String>) -> Self {
        Self::InvalidPreset(msg.into())
    }
}

impl From<validator::ValidationErrors> for ModelError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::InvalidPreset(errors.to_string())
    }
}
