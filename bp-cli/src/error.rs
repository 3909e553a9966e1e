//! CLI Error Types

use bp_core::{BpError, PipelineStage};
use bp_store::StoreError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Ledger error
    #[error("{0}")]
    LedgerError(#[from] BpError),

    /// Storage error raised while opening the backend
    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),

    /// Award pipeline reported failure
    #[error("Award failed [{code}]: {message}")]
    AwardFailed {
        code: String,
        stage: Option<PipelineStage>,
        message: String,
    },

    /// Commit aborted by the preview/commit protocol
    #[error("Commit aborted: {reason}")]
    Aborted { reason: String },
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn config(message: impl Into<String>) -> Self {
        CliError::ConfigError {
            message: message.into(),
        }
    }

    pub fn invalid_arg(message: impl Into<String>) -> Self {
        CliError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Get exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ConfigError { .. } => 1,
            CliError::InvalidArgument { .. } => 2,
            CliError::IoError(_) => 5,
            CliError::JsonError(_) => 6,
            CliError::LedgerError(e) => ledger_exit_code(e.code()),
            CliError::StoreError(_) => 31,
            CliError::AwardFailed { code, .. } => ledger_exit_code(code),
            CliError::Aborted { .. } => 40,
        }
    }
}

/// Exit code per registry code; lock timeouts get their own so scripts can retry
fn ledger_exit_code(code: &str) -> i32 {
    match code {
        "BP-AWARD-001" => 2,
        "BP-AWARD-002" => 21,
        "BP-AWARD-003" => 22,
        "BP-AWARD-004" => 23,
        "BP-SPEND-001" | "BP-SPEND-002" => 24,
        "BP-CREDIT-001" => 25,
        "BP-STORE-001" | "BP-STORE-002" => 31,
        _ => 10,
    }
}
