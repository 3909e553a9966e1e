//! Store Error Types

use bp_core::BpError;
use thiserror::Error;

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Persisted schema version differs from this build
    #[error("Schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn database(context: &str, err: impl std::fmt::Display) -> Self {
        Self::Database(format!("{}: {}", context, err))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<StoreError> for BpError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization(msg) => BpError::Serialization(msg),
            StoreError::SchemaMismatch { expected, found } => {
                BpError::SchemaMismatch { expected, found }
            }
            StoreError::Validation(msg) => BpError::invalid_input(msg),
            StoreError::Database(msg) => BpError::Storage(msg),
        }
    }
}
