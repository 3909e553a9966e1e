//! Audit Trail
//!
//! Non-fatal sink: a failed write is reported on the diagnostics target and
//! counted, and the calling operation carries on as if it had succeeded.

use bp_core::canon::Canonicalizer;
use bp_core::types::{AuditAction, AuditLogEntry, AuditStatus, Digest, EventId};
use bp_core::{BpResult, AUDIT_DIAGNOSTICS_TARGET};
use bp_store::AuditStore;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

pub struct AuditTrail {
    store: Arc<dyn AuditStore>,
    store_id: String,
    canonicalizer: Canonicalizer,
    failures: AtomicU64,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn AuditStore>, store_id: impl Into<String>) -> Self {
        Self {
            store,
            store_id: store_id.into(),
            canonicalizer: Canonicalizer::v1(),
            failures: AtomicU64::new(0),
        }
    }

    pub fn with_canonicalizer(mut self, canonicalizer: Canonicalizer) -> Self {
        self.canonicalizer = canonicalizer;
        self
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// Start an entry stamped with this trail's store id
    pub fn entry(&self, action: AuditAction, status: AuditStatus) -> AuditLogEntry {
        AuditLogEntry::new(self.store_id.clone(), action, status)
    }

    /// Append, never failing the caller
    pub async fn record(&self, entry: AuditLogEntry) {
        match self.store.append_audit(&entry).await {
            Ok(()) => {
                debug!(action = %entry.action, status = %entry.status, "Audit entry written");
            }
            Err(e) => {
                let total = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                error!(
                    target: AUDIT_DIAGNOSTICS_TARGET,
                    action = %entry.action,
                    status = %entry.status,
                    event_id = ?entry.event_id,
                    player_id = ?entry.player_id,
                    failures = total,
                    error = %e,
                    "Audit write failed"
                );
            }
        }
    }

    /// Writes dropped since start-up
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Deterministic digest of an allocation or payload
    pub fn content_hash<T: Serialize>(&self, payload: &T) -> BpResult<Digest> {
        self.canonicalizer.allocation_hash(payload)
    }

    /// Last `limit` entries, oldest first
    pub async fn tail(&self, limit: usize) -> BpResult<Vec<AuditLogEntry>> {
        Ok(self.store.recent_audit(limit).await?)
    }

    pub async fn for_event(&self, event_id: &EventId) -> BpResult<Vec<AuditLogEntry>> {
        Ok(self.store.audit_for_event(event_id).await?)
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("store_id", &self.store_id)
            .field("failures", &self.failure_count())
            .finish()
    }
}
