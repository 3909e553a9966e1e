//! Preview / Commit Protocol
//!
//! ```text
//! NONE --preview--> PREVIEWED --commit ok--> COMMITTED (terminal)
//!                       |
//!                       +--mismatch/expired--> ABORTED --preview--> PREVIEWED
//! ```
//!
//! No lock spans the two phases. The commit compares the caller's hash with
//! the latest live preview and only writes spend on an exact match. The event
//! is marked COMMITTED before spend is written and reopened if the write fails.

use bp_core::spend::{decide_commit, CommitDecision};
use bp_core::types::{
    active_total, tags, AbortReason, AuditAction, AuditStatus, Band, CommitOutcome, Digest,
    EventId, PreviewArtifact, PreviewState, SpendLineItem,
};
use bp_core::{BpError, BpResult};
use bp_store::LedgerStorage;
use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::audit::AuditTrail;
use crate::spend::SpentPoolService;

/// Proposed allocation to preview
#[derive(Clone, Debug)]
pub struct PreviewRequest<T> {
    pub event_id: EventId,
    /// Computed by the catalog/prize engine; hashed, never inspected
    pub allocation: T,
    pub seed: Option<String>,
    pub operator: String,
}

/// Allocation actually being applied
#[derive(Clone, Debug)]
pub struct CommitRequest {
    pub event_id: EventId,
    pub event_type: String,
    pub commit_hash: Digest,
    pub lines: Vec<SpendLineItem>,
    pub operator: String,
}

pub struct PreviewCommitService {
    storage: Arc<dyn LedgerStorage>,
    spend: Arc<SpentPoolService>,
    audit: Arc<AuditTrail>,
    ttl: Duration,
    /// Serializes commits against each other only
    commit_gate: Mutex<()>,
}

impl PreviewCommitService {
    pub fn new(
        storage: Arc<dyn LedgerStorage>,
        spend: Arc<SpentPoolService>,
        audit: Arc<AuditTrail>,
        ttl: Duration,
    ) -> Self {
        Self {
            storage,
            spend,
            audit,
            ttl,
            commit_gate: Mutex::new(()),
        }
    }

    /// Digest a caller would supply at commit time
    pub fn hash_allocation<T: Serialize>(&self, allocation: &T) -> BpResult<Digest> {
        self.audit.content_hash(allocation)
    }

    pub async fn state(&self, event_id: &EventId) -> BpResult<PreviewState> {
        Ok(self.storage.event_state(event_id).await?)
    }

    /// Hash and store the proposed allocation
    pub async fn preview<T: Serialize>(
        &self,
        request: PreviewRequest<T>,
    ) -> BpResult<PreviewArtifact> {
        let state = self.state(&request.event_id).await?;
        if !state.can_preview() {
            return Err(BpError::InvalidState {
                reason: format!("event {} is already committed", request.event_id),
            });
        }

        let hash = self.hash_allocation(&request.allocation)?;
        let artifact = PreviewArtifact::new(
            request.event_id.clone(),
            request.seed.clone(),
            hash,
            Utc::now(),
            self.ttl,
        );
        self.storage.save_preview(&artifact).await?;
        self.storage
            .set_event_state(&request.event_id, PreviewState::Previewed)
            .await?;

        info!(
            event_id = %request.event_id,
            preview_hash = %artifact.preview_hash,
            expires_at = %artifact.expires_at,
            "Preview stored"
        );
        let entry = self
            .audit
            .entry(AuditAction::Preview, AuditStatus::Success)
            .with_event(request.event_id)
            .with_operator(request.operator)
            .with_seed(request.seed)
            .with_checksums(Some(artifact.preview_hash.to_hex()), None);
        self.audit.record(entry).await;

        Ok(artifact)
    }

    /// Compare-and-commit. A mismatch or missing preview is an `Aborted`
    /// outcome, not an error.
    pub async fn commit(&self, request: CommitRequest) -> BpResult<CommitOutcome> {
        let _gate = self.commit_gate.lock().await;
        let event_id = &request.event_id;

        let state = self.state(event_id).await?;
        let decision = match state {
            PreviewState::Committed => {
                return Err(BpError::InvalidState {
                    reason: format!("event {} is already committed", event_id),
                })
            }
            // An abort consumes the preview; staff must preview again
            PreviewState::Aborted | PreviewState::None => CommitDecision::Abort {
                reason: AbortReason::NoPreview,
            },
            PreviewState::Previewed => {
                let artifacts = self.storage.previews_for_event(event_id).await?;
                decide_commit(&artifacts, &request.commit_hash, &Utc::now())
            }
        };

        match decision {
            CommitDecision::Proceed { preview } => self.apply(&request, &preview).await,
            CommitDecision::Abort { reason } => self.abort(&request, reason).await,
        }
    }

    async fn apply(
        &self,
        request: &CommitRequest,
        preview: &PreviewArtifact,
    ) -> BpResult<CommitOutcome> {
        // Consume the preview before spending against it
        if let Err(e) = self
            .storage
            .set_event_state(&request.event_id, PreviewState::Committed)
            .await
        {
            let e = BpError::from(e);
            self.record_commit_failure(request, &e).await;
            return Err(e);
        }

        let batch_id = self.spend.new_batch_id();
        let written = match self
            .spend
            .write_spent_pool(&request.event_id, &request.event_type, &batch_id, &request.lines)
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                if let Err(rollback) = self
                    .storage
                    .set_event_state(&request.event_id, PreviewState::Previewed)
                    .await
                {
                    error!(
                        event_id = %request.event_id,
                        error = %rollback,
                        "Spend failed and event could not be reopened"
                    );
                }
                self.record_commit_failure(request, &e).await;
                return Err(e);
            }
        };

        let total = active_total(&written);
        info!(
            event_id = %request.event_id,
            batch_id = %batch_id,
            count = written.len(),
            total,
            "Commit applied"
        );
        let entry = self
            .audit
            .entry(AuditAction::Commit, AuditStatus::Success)
            .with_event(request.event_id.clone())
            .with_operator(request.operator.clone())
            .with_seed(preview.seed.clone())
            .with_checksums(
                Some(preview.preview_hash.to_hex()),
                Some(request.commit_hash.to_hex()),
            )
            .with_details(
                serde_json::json!({ "batch_id": batch_id.as_str(), "total": total }).to_string(),
            );
        self.audit.record(entry).await;

        Ok(CommitOutcome::Committed {
            batch_id,
            entries_written: written.len(),
            total,
        })
    }

    async fn record_commit_failure(&self, request: &CommitRequest, e: &BpError) {
        let entry = self
            .audit
            .entry(AuditAction::Commit, AuditStatus::Failure)
            .with_event(request.event_id.clone())
            .with_operator(request.operator.clone())
            .with_band(Band::Red)
            .with_details(e.to_string());
        self.audit.record(entry).await;
    }

    async fn abort(&self, request: &CommitRequest, reason: AbortReason) -> BpResult<CommitOutcome> {
        self.storage
            .set_event_state(&request.event_id, PreviewState::Aborted)
            .await?;
        warn!(event_id = %request.event_id, reason = %reason, "Commit aborted");

        let tag = match reason {
            AbortReason::HashMismatch => tags::HASH_MISMATCH,
            AbortReason::NoPreview | AbortReason::PreviewExpired => tags::NO_PREVIEW,
        };
        let entry = self
            .audit
            .entry(AuditAction::Commit, AuditStatus::Aborted)
            .with_event(request.event_id.clone())
            .with_operator(request.operator.clone())
            .with_checksums(None, Some(request.commit_hash.to_hex()))
            .with_band(Band::Amber)
            .with_tag(tag)
            .with_details(reason.as_str());
        self.audit.record(entry).await;

        Ok(CommitOutcome::Aborted { reason })
    }
}
