//! Error types for the gridcast engine

use thiserror::Error;

/// Result type alias for gridcast operations
pub type Result<T> = std::result::Result<T, GridcastError>;

/// Main error type for the gridcast engine
#[derive(Error, Debug)]
pub enum GridcastError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Insufficient history: need {needed} calendar buckets, found {available}")]
    InsufficientHistory { needed: usize, available: usize },

    #[error("Alignment error: {0}")]
    AlignmentError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature schema mismatch: model was fitted on [{expected}], matrix provides [{actual}]")]
    SchemaMismatch { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for GridcastError {
    fn from(err: polars::error::PolarsError) -> Self {
        GridcastError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for GridcastError {
    fn from(err: serde_json::Error) -> Self {
        GridcastError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GridcastError::ConfigError("lag offset must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: lag offset must be positive"
        );
    }

    #[test]
    fn test_insufficient_history_display() {
        let err = GridcastError::InsufficientHistory {
            needed: 2,
            available: 1,
        };
        assert!(err.to_string().contains("need 2"));
    }
}
