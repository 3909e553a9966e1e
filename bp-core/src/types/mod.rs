//! Core Type Definitions
//!
//! All types follow these naming conventions:
//! - snake_case for field names
//! - *_id suffix for primary keys
//! - *_hash / checksum_* for digests

pub mod audit;
pub mod common;
pub mod credit;
pub mod ledger;
pub mod preview;
pub mod spend;

pub use audit::{tags, AuditAction, AuditLogEntry, AuditStatus};
pub use common::{AwardSource, Band, BatchId, Digest, EventId, PlayerId, PreviewId};
pub use credit::{derive_balance, CreditDirection, CreditTransaction};
pub use ledger::{BpTotalRow, PrestigeRecord, RedemptionRecord, SourceLedgerRow};
pub use preview::{AbortReason, CommitOutcome, PreviewArtifact, PreviewState};
pub use spend::{active_total, SpendLineItem, SpentPoolEntry};
