//! Bonus Points Error Codes Registry
//!
//! Error code format: BP-{module}-{sequence}
//! - BP-AWARD: Award entry point and pipeline errors
//! - BP-SPEND: Spent pool and preview/commit errors
//! - BP-CREDIT: Store credit ledger errors
//! - BP-STORE: Storage errors surfaced to the domain

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bonus points result type
pub type BpResult<T> = Result<T, BpError>;

/// Named stage of the award pipeline.
///
/// Stages run in declaration order; a failure names the first stage that did
/// not complete so callers know how far the pipeline progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    SourceWrite,
    Aggregate,
    Governor,
    Prestige,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceWrite => "source_write",
            Self::Aggregate => "aggregate",
            Self::Governor => "governor",
            Self::Prestige => "prestige",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bonus points error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BpError {
    // ============================================================
    // Award Errors (BP-AWARD-*)
    // ============================================================
    /// [BP-AWARD-001] Pre-mutation validation failure
    #[error("[BP-AWARD-001] Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// [BP-AWARD-002] Identity resolver could not map the input to a player
    #[error("[BP-AWARD-002] Player not found: {input}")]
    PlayerNotFound { input: String },

    /// [BP-AWARD-003] Process-wide lock not acquired within the bounded wait
    #[error("[BP-AWARD-003] Lock not acquired within {waited_ms}ms")]
    LockTimeout { waited_ms: u64 },

    /// [BP-AWARD-004] A pipeline stage failed after earlier stages committed
    #[error("[BP-AWARD-004] Stage {stage} failed: {reason}")]
    StageFailure { stage: PipelineStage, reason: String },

    // ============================================================
    // Spend Errors (BP-SPEND-*)
    // ============================================================
    /// [BP-SPEND-001] Event is in a state that forbids the operation
    #[error("[BP-SPEND-001] Invalid state: {reason}")]
    InvalidState { reason: String },

    /// [BP-SPEND-002] Malformed digest
    #[error("[BP-SPEND-002] Invalid digest format")]
    InvalidDigest,

    // ============================================================
    // Credit Errors (BP-CREDIT-*)
    // ============================================================
    /// [BP-CREDIT-001] Debit exceeds the derived balance
    #[error("[BP-CREDIT-001] Insufficient balance for {player_id}: required {required}, available {available}")]
    InsufficientBalance {
        player_id: String,
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    // ============================================================
    // Storage Errors (BP-STORE-*)
    // ============================================================
    /// [BP-STORE-001] Backend failure
    #[error("[BP-STORE-001] Storage error: {0}")]
    Storage(String),

    /// [BP-STORE-002] Persisted schema does not match this build
    #[error("[BP-STORE-002] Schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },

    // ============================================================
    // General Errors
    // ============================================================
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BpError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn stage(stage: PipelineStage, reason: impl std::fmt::Display) -> Self {
        Self::StageFailure {
            stage,
            reason: reason.to_string(),
        }
    }

    /// Registry code, e.g. `BP-AWARD-003`
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "BP-AWARD-001",
            Self::PlayerNotFound { .. } => "BP-AWARD-002",
            Self::LockTimeout { .. } => "BP-AWARD-003",
            Self::StageFailure { .. } => "BP-AWARD-004",
            Self::InvalidState { .. } => "BP-SPEND-001",
            Self::InvalidDigest => "BP-SPEND-002",
            Self::InsufficientBalance { .. } => "BP-CREDIT-001",
            Self::Storage(_) => "BP-STORE-001",
            Self::SchemaMismatch { .. } => "BP-STORE-002",
            Self::Serialization(_) => "BP-SER-001",
            Self::Config(_) => "BP-CFG-001",
        }
    }

    /// Whether the call performed no mutation and may simply be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}

impl From<serde_json::Error> for BpError {
    fn from(err: serde_json::Error) -> Self {
        BpError::Serialization(err.to_string())
    }
}
