//! Audit Log Types
//!
//! Immutable, append-only records of every state-changing action.

use super::common::{Band, EventId, PlayerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Audit action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Award,
    Resync,
    Preview,
    Commit,
    Revert,
    CreditIn,
    CreditOut,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Award => "AWARD",
            Self::Resync => "RESYNC",
            Self::Preview => "PREVIEW",
            Self::Commit => "COMMIT",
            Self::Revert => "REVERT",
            Self::CreditIn => "CREDIT_IN",
            Self::CreditOut => "CREDIT_OUT",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome recorded on an audit entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Success,
    Failure,
    Aborted,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Aborted => "ABORTED",
        }
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rule codes tagged onto award entries
pub mod tags {
    /// Balance was clamped at the cap
    pub const CAP: &str = "CAP";
    /// Overflow was produced and converted
    pub const OVERFLOW: &str = "OVERFLOW";
    /// Prestige counter advanced
    pub const PRESTIGE_UP: &str = "PRESTIGE_UP";
    /// Player matched by substring rather than exact id
    pub const FUZZY_MATCH: &str = "FUZZY_MATCH";
    /// Commit hash did not match the active preview
    pub const HASH_MISMATCH: &str = "HASH_MISMATCH";
    /// No active preview at commit time
    pub const NO_PREVIEW: &str = "NO_PREVIEW";
}

/// Audit log entry.
///
/// Field order of [`AuditLogEntry::to_record`] is the external record layout:
/// Timestamp, StoreId, EventId, Action, Operator, PlayerId, Seed,
/// ChecksumBefore, ChecksumAfter, Band, Tags, Details, Status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: DateTime<Utc>,
    pub store_id: String,
    pub event_id: Option<EventId>,
    pub action: AuditAction,
    pub operator: String,
    pub player_id: Option<PlayerId>,
    pub seed: Option<String>,
    pub checksum_before: Option<String>,
    pub checksum_after: Option<String>,
    pub band: Band,
    pub tags: BTreeSet<String>,
    pub details: String,
    pub status: AuditStatus,
}

impl AuditLogEntry {
    pub fn new(store_id: impl Into<String>, action: AuditAction, status: AuditStatus) -> Self {
        Self {
            timestamp: Utc::now(),
            store_id: store_id.into(),
            event_id: None,
            action,
            operator: String::new(),
            player_id: None,
            seed: None,
            checksum_before: None,
            checksum_after: None,
            band: Band::default(),
            tags: BTreeSet::new(),
            details: String::new(),
            status,
        }
    }

    pub fn with_event(mut self, event_id: EventId) -> Self {
        self.event_id = Some(event_id);
        self
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    pub fn with_player(mut self, player_id: PlayerId) -> Self {
        self.player_id = Some(player_id);
        self
    }

    pub fn with_seed(mut self, seed: Option<String>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_checksums(mut self, before: Option<String>, after: Option<String>) -> Self {
        self.checksum_before = before;
        self.checksum_after = after;
        self
    }

    pub fn with_band(mut self, band: Band) -> Self {
        self.band = band;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// Flatten to the ordered external record layout
    pub fn to_record(&self) -> Vec<String> {
        vec![
            self.timestamp.to_rfc3339(),
            self.store_id.clone(),
            self.event_id.as_ref().map(|e| e.0.clone()).unwrap_or_default(),
            self.action.as_str().to_string(),
            self.operator.clone(),
            self.player_id.as_ref().map(|p| p.0.clone()).unwrap_or_default(),
            self.seed.clone().unwrap_or_default(),
            self.checksum_before.clone().unwrap_or_default(),
            self.checksum_after.clone().unwrap_or_default(),
            self.band.as_str().to_string(),
            self.tags.iter().cloned().collect::<Vec<_>>().join(","),
            self.details.clone(),
            self.status.as_str().to_string(),
        ]
    }
}
