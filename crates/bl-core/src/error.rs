//! Error types for Barline

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum BlError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias
pub type BlResult<T> = Result<T, BlError>;
