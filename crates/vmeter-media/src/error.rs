//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while loading the engine or analyzing media.
///
/// A log without loudness markers is not an error; it yields a
/// measurement with absent readings.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Loudness engine unavailable: {message}")]
    EngineUnavailable { message: String },

    #[error("Loudness analysis failed: {message}")]
    AnalysisFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },
}

impl MediaError {
    /// Create an engine initialization error.
    pub fn engine_unavailable(message: impl Into<String>) -> Self {
        Self::EngineUnavailable {
            message: message.into(),
        }
    }

    /// Create an analysis failure error.
    pub fn analysis_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::AnalysisFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn is_engine_unavailable(&self) -> bool {
        matches!(self, MediaError::EngineUnavailable { .. })
    }

    /// Captured engine output, when the failure produced any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            MediaError::AnalysisFailed { stderr, .. } => stderr.as_deref(),
            MediaError::EngineUnavailable { .. } => None,
        }
    }
}
