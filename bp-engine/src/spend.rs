//! Spent Pool / Batch Ledger

use bp_core::types::{
    active_total, AuditAction, AuditStatus, BatchId, EventId, SpendLineItem, SpentPoolEntry,
};
use bp_core::{new_batch_id, BpError, BpResult};
use bp_store::LedgerStorage;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::audit::AuditTrail;

pub struct SpentPoolService {
    storage: Arc<dyn LedgerStorage>,
    audit: Arc<AuditTrail>,
}

impl SpentPoolService {
    pub fn new(storage: Arc<dyn LedgerStorage>, audit: Arc<AuditTrail>) -> Self {
        Self { storage, audit }
    }

    /// Fresh time-sortable batch id
    pub fn new_batch_id(&self) -> BatchId {
        new_batch_id()
    }

    /// Price and append line items under `batch_id`. All lines are validated
    /// before anything is written.
    pub async fn write_spent_pool(
        &self,
        event_id: &EventId,
        event_type: &str,
        batch_id: &BatchId,
        lines: &[SpendLineItem],
    ) -> BpResult<Vec<SpentPoolEntry>> {
        if lines.is_empty() {
            return Err(BpError::invalid_input("spend batch has no line items"));
        }
        let now = Utc::now();
        let entries = lines
            .iter()
            .map(|line| SpentPoolEntry::from_line(event_id, event_type, batch_id, line, now))
            .collect::<BpResult<Vec<_>>>()?;

        self.storage.append_spent(&entries).await?;
        info!(
            event_id = %event_id,
            batch_id = %batch_id,
            count = entries.len(),
            total = active_total(&entries),
            "Spent pool written"
        );
        Ok(entries)
    }

    /// Sum of non-reverted totals for the event
    pub async fn get_event_spent(&self, event_id: &EventId) -> BpResult<u64> {
        let entries = self.storage.spent_for_event(event_id).await?;
        Ok(active_total(&entries))
    }

    pub async fn entries_for_event(&self, event_id: &EventId) -> BpResult<Vec<SpentPoolEntry>> {
        Ok(self.storage.spent_for_event(event_id).await?)
    }

    pub async fn entries_for_batch(&self, batch_id: &BatchId) -> BpResult<Vec<SpentPoolEntry>> {
        Ok(self.storage.spent_for_batch(batch_id).await?)
    }

    /// Revert every live entry in the batch. Safe to repeat: a second call
    /// returns 0 and writes no audit entry.
    pub async fn revert_batch(&self, batch_id: &BatchId, operator: &str) -> BpResult<usize> {
        let flipped = self.storage.mark_batch_reverted(batch_id).await?;
        let count = flipped.len();
        if count == 0 {
            return Ok(0);
        }

        let reverted_total: u64 = flipped.iter().map(|e| e.total).sum();
        info!(batch_id = %batch_id, count, "Batch reverted");

        let mut entry = self
            .audit
            .entry(AuditAction::Revert, AuditStatus::Success)
            .with_operator(operator)
            .with_details(
                serde_json::json!({
                    "batch_id": batch_id.as_str(),
                    "reverted": count,
                    "batch_total": reverted_total,
                })
                .to_string(),
            );
        if let Some(event_id) = flipped.first().map(|e| e.event_id.clone()) {
            entry = entry.with_event(event_id);
        }
        self.audit.record(entry).await;

        Ok(count)
    }
}
