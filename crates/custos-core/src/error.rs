//! Error types for the core domain model.

use thiserror::Error;

use crate::validate::ValidationError;

/// Errors produced while building or (de)serializing domain records.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A draft failed ingestion validation.
    #[error("event validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A record could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
