//! Error types for Compass.
//!
//! One enum covers every failure the retrieval-and-memory subsystem can
//! surface, plus the configuration, I/O and completion errors of the
//! surrounding application. Empty inputs and empty indexes are never errors;
//! they come back as `Ok` with an empty value.

use thiserror::Error;

/// Unified error type for Compass.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Completion backend errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// No embedding backend is configured or reachable.
    ///
    /// Not retryable without reconfiguration.
    #[error("Embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// An embedding backend call failed for a batch.
    ///
    /// Transient; the caller may retry the whole ingestion or query.
    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    /// The gateway produced no vectors for non-empty input.
    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),

    /// The document could not be turned into text.
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// The document format is not handled by the configured extractor.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Saving or loading a persisted file failed.
    ///
    /// In-memory state remains usable when this is returned from ingestion.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A vector batch does not match the index dimensionality.
    #[error("Index dimension mismatch: expected {expected}, got {actual}")]
    IndexDimensionMismatch { expected: usize, actual: usize },

    /// Knowledge base errors not covered above
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether retrying the same call may succeed without reconfiguration.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::EmbeddingService(_) | AppError::Llm(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::EmbeddingService("timeout".to_string()).is_retryable());
        assert!(AppError::Llm("503".to_string()).is_retryable());
        assert!(!AppError::EmbeddingUnavailable("no key".to_string()).is_retryable());
        assert!(!AppError::Persistence("disk full".to_string()).is_retryable());
    }

    #[test]
    fn test_json_error_converts_to_serialization() {
        let err: AppError = serde_json::from_str::<Vec<u32>>("[1,").unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = AppError::IndexDimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert_eq!(
            err.to_string(),
            "Index dimension mismatch: expected 384, got 768"
        );
    }
}
