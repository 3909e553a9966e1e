//! Preview/Commit Types

use super::common::{BatchId, Digest, EventId, PreviewId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored hash of a proposed allocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewArtifact {
    pub id: PreviewId,
    pub event_id: EventId,
    pub seed: Option<String>,
    pub preview_hash: Digest,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PreviewArtifact {
    pub fn new(
        event_id: EventId,
        seed: Option<String>,
        preview_hash: Digest,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let id = PreviewId::new(format!("preview:{}:{}", event_id.as_str(), Uuid::new_v4()));
        Self {
            id,
            event_id,
            seed,
            preview_hash,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    /// Usable for commit only while `now < expires_at`
    pub fn is_active(&self, now: &DateTime<Utc>) -> bool {
        *now < self.expires_at
    }
}

/// Per-event protocol state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewState {
    None,
    Previewed,
    Committed,
    Aborted,
}

impl PreviewState {
    /// Committed is the only state that forbids a new preview
    pub fn can_preview(&self) -> bool {
        !matches!(self, Self::Committed)
    }
}

/// Why a commit was aborted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// No preview artifact was ever stored for the event
    NoPreview,
    /// The latest artifact is past its expiry
    PreviewExpired,
    /// Supplied hash differs from the stored preview hash
    HashMismatch,
}

impl AbortReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoPreview => "no_preview",
            Self::PreviewExpired => "preview_expired",
            Self::HashMismatch => "hash_mismatch",
        }
    }
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a commit attempt. Aborts are designed outcomes, not errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommitOutcome {
    Committed {
        batch_id: BatchId,
        entries_written: usize,
        total: u64,
    },
    Aborted {
        reason: AbortReason,
    },
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    pub fn batch_id(&self) -> Option<&BatchId> {
        match self {
            Self::Committed { batch_id, .. } => Some(batch_id),
            Self::Aborted { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_expiry_is_exclusive() {
        let now = Utc::now();
        let artifact = PreviewArtifact::new(
            EventId::new("E1"),
            None,
            Digest::sha256(b"plan"),
            now,
            Duration::seconds(60),
        );
        assert!(artifact.is_active(&now));
        assert!(!artifact.is_active(&artifact.expires_at));
        assert!(!artifact.is_active(&(now + Duration::seconds(61))));
    }

    #[test]
    fn test_committed_blocks_preview() {
        assert!(PreviewState::None.can_preview());
        assert!(PreviewState::Aborted.can_preview());
        assert!(!PreviewState::Committed.can_preview());
    }
}
