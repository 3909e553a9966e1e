//! Commit Decision
//!
//! Compare-and-commit on a digest. No artifact, only expired artifacts, or a
//! different hash all abort; nothing here writes.

use crate::types::{AbortReason, Digest, PreviewArtifact};
use chrono::{DateTime, Utc};

/// Outcome of checking a commit hash against stored previews
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitDecision {
    Proceed { preview: PreviewArtifact },
    Abort { reason: AbortReason },
}

impl CommitDecision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed { .. })
    }
}

/// Most recent artifact that is still active at `now`
pub fn latest_active_preview<'a>(
    artifacts: &'a [PreviewArtifact],
    now: &DateTime<Utc>,
) -> Option<&'a PreviewArtifact> {
    artifacts
        .iter()
        .filter(|a| a.is_active(now))
        .max_by_key(|a| a.created_at)
}

/// Decide a commit for one event's preview artifacts
pub fn decide_commit(
    artifacts: &[PreviewArtifact],
    commit_hash: &Digest,
    now: &DateTime<Utc>,
) -> CommitDecision {
    let Some(active) = latest_active_preview(artifacts, now) else {
        let reason = if artifacts.is_empty() {
            AbortReason::NoPreview
        } else {
            AbortReason::PreviewExpired
        };
        return CommitDecision::Abort { reason };
    };

    if &active.preview_hash == commit_hash {
        CommitDecision::Proceed {
            preview: active.clone(),
        }
    } else {
        CommitDecision::Abort {
            reason: AbortReason::HashMismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventId;
    use chrono::Duration;

    fn artifact(hash: &Digest, created: DateTime<Utc>, ttl_secs: i64) -> PreviewArtifact {
        PreviewArtifact::new(
            EventId::new("E1"),
            None,
            hash.clone(),
            created,
            Duration::seconds(ttl_secs),
        )
    }

    #[test]
    fn test_no_preview_aborts() {
        let d = decide_commit(&[], &Digest::sha256(b"h1"), &Utc::now());
        assert_eq!(
            d,
            CommitDecision::Abort {
                reason: AbortReason::NoPreview
            }
        );
    }

    #[test]
    fn test_expired_preview_aborts() {
        let h1 = Digest::sha256(b"h1");
        let created = Utc::now() - Duration::hours(25);
        let d = decide_commit(&[artifact(&h1, created, 86_400)], &h1, &Utc::now());
        assert_eq!(
            d,
            CommitDecision::Abort {
                reason: AbortReason::PreviewExpired
            }
        );
    }

    #[test]
    fn test_matching_hash_proceeds() {
        let h1 = Digest::sha256(b"h1");
        let d = decide_commit(&[artifact(&h1, Utc::now(), 60)], &h1, &Utc::now());
        assert!(d.is_proceed());
    }

    #[test]
    fn test_mismatch_aborts() {
        let h1 = Digest::sha256(b"h1");
        let h2 = Digest::sha256(b"h2");
        let d = decide_commit(&[artifact(&h1, Utc::now(), 60)], &h2, &Utc::now());
        assert_eq!(
            d,
            CommitDecision::Abort {
                reason: AbortReason::HashMismatch
            }
        );
    }

    #[test]
    fn test_latest_preview_wins() {
        let h1 = Digest::sha256(b"h1");
        let h2 = Digest::sha256(b"h2");
        let now = Utc::now();
        let older = artifact(&h1, now - Duration::minutes(5), 3_600);
        let newer = artifact(&h2, now - Duration::minutes(1), 3_600);
        let artifacts = vec![newer, older];

        assert!(decide_commit(&artifacts, &h2, &now).is_proceed());
        assert!(!decide_commit(&artifacts, &h1, &now).is_proceed());
    }
}
