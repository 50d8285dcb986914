//! Error types for the obesity-stack training and inference pipeline

use thiserror::Error;

/// Result type alias for library operations
pub type Result<T> = std::result::Result<T, ObesityError>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum ObesityError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid value for numeric column '{column}': {value}")]
    InputTypeError { column: String, value: String },

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<polars::error::PolarsError> for ObesityError {
    fn from(err: polars::error::PolarsError) -> Self {
        ObesityError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for ObesityError {
    fn from(err: serde_json::Error) -> Self {
        ObesityError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for ObesityError {
    fn from(err: bincode::Error) -> Self {
        ObesityError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ObesityError {
    fn from(err: ndarray::ShapeError) -> Self {
        ObesityError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
