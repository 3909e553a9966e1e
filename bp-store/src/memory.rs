//! In-Memory Storage
//!
//! Not persistent. Each collection sits behind its own tokio `RwLock`.

use async_trait::async_trait;
use bp_core::types::{
    AuditLogEntry, AwardSource, BatchId, BpTotalRow, CreditTransaction, EventId, PlayerId,
    PreviewArtifact, PreviewState, PrestigeRecord, RedemptionRecord, SourceLedgerRow,
    SpentPoolEntry,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{AuditStore, LedgerStorage, StoreResult};

/// In-memory storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    source_rows: Arc<RwLock<HashMap<(PlayerId, AwardSource), SourceLedgerRow>>>,
    totals: Arc<RwLock<HashMap<PlayerId, BpTotalRow>>>,
    prestige: Arc<RwLock<HashMap<PlayerId, PrestigeRecord>>>,
    redemptions: Arc<RwLock<HashMap<PlayerId, RedemptionRecord>>>,
    spent: Arc<RwLock<Vec<SpentPoolEntry>>>,
    previews: Arc<RwLock<Vec<PreviewArtifact>>>,
    event_states: Arc<RwLock<HashMap<EventId, PreviewState>>>,
    credit_log: Arc<RwLock<Vec<CreditTransaction>>>,
    audit_log: Arc<RwLock<Vec<AuditLogEntry>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of audit entries written
    pub async fn audit_len(&self) -> usize {
        self.audit_log.read().await.len()
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn get_source_row(
        &self,
        player_id: &PlayerId,
        source: AwardSource,
    ) -> StoreResult<Option<SourceLedgerRow>> {
        let rows = self.source_rows.read().await;
        Ok(rows.get(&(player_id.clone(), source)).cloned())
    }

    async fn upsert_source_row(&self, row: &SourceLedgerRow) -> StoreResult<()> {
        let mut rows = self.source_rows.write().await;
        rows.insert((row.player_id.clone(), row.source), row.clone());
        Ok(())
    }

    async fn list_source_rows(&self, player_id: &PlayerId) -> StoreResult<Vec<SourceLedgerRow>> {
        let rows = self.source_rows.read().await;
        let mut out: Vec<_> = rows
            .values()
            .filter(|r| &r.player_id == player_id)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.source);
        Ok(out)
    }

    async fn get_total(&self, player_id: &PlayerId) -> StoreResult<Option<BpTotalRow>> {
        Ok(self.totals.read().await.get(player_id).cloned())
    }

    async fn put_total(&self, row: &BpTotalRow) -> StoreResult<()> {
        self.totals
            .write()
            .await
            .insert(row.player_id.clone(), row.clone());
        Ok(())
    }

    async fn get_prestige(&self, player_id: &PlayerId) -> StoreResult<Option<PrestigeRecord>> {
        Ok(self.prestige.read().await.get(player_id).cloned())
    }

    async fn put_prestige(&self, record: &PrestigeRecord) -> StoreResult<()> {
        self.prestige
            .write()
            .await
            .insert(record.player_id.clone(), record.clone());
        Ok(())
    }

    async fn total_redeemed(&self, player_id: &PlayerId) -> StoreResult<u64> {
        let redemptions = self.redemptions.read().await;
        Ok(redemptions
            .get(player_id)
            .map(|r| r.total_redeemed)
            .unwrap_or(0))
    }

    async fn record_redemption(
        &self,
        player_id: &PlayerId,
        amount: u64,
    ) -> StoreResult<RedemptionRecord> {
        let mut redemptions = self.redemptions.write().await;
        let record = redemptions
            .entry(player_id.clone())
            .or_insert_with(|| RedemptionRecord::new(player_id.clone()));
        record.total_redeemed = record.total_redeemed.saturating_add(amount);
        record.last_updated = Utc::now();
        Ok(record.clone())
    }

    async fn append_spent(&self, entries: &[SpentPoolEntry]) -> StoreResult<()> {
        self.spent.write().await.extend_from_slice(entries);
        Ok(())
    }

    async fn spent_for_event(&self, event_id: &EventId) -> StoreResult<Vec<SpentPoolEntry>> {
        let spent = self.spent.read().await;
        Ok(spent
            .iter()
            .filter(|e| &e.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn spent_for_batch(&self, batch_id: &BatchId) -> StoreResult<Vec<SpentPoolEntry>> {
        let spent = self.spent.read().await;
        Ok(spent
            .iter()
            .filter(|e| &e.batch_id == batch_id)
            .cloned()
            .collect())
    }

    async fn mark_batch_reverted(&self, batch_id: &BatchId) -> StoreResult<Vec<SpentPoolEntry>> {
        let mut spent = self.spent.write().await;
        let flipped = spent
            .iter_mut()
            .filter(|e| &e.batch_id == batch_id)
            .filter_map(|e| e.mark_reverted().then(|| e.clone()))
            .collect();
        Ok(flipped)
    }

    async fn save_preview(&self, artifact: &PreviewArtifact) -> StoreResult<()> {
        self.previews.write().await.push(artifact.clone());
        Ok(())
    }

    async fn previews_for_event(&self, event_id: &EventId) -> StoreResult<Vec<PreviewArtifact>> {
        let previews = self.previews.read().await;
        Ok(previews
            .iter()
            .filter(|a| &a.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn event_state(&self, event_id: &EventId) -> StoreResult<PreviewState> {
        let states = self.event_states.read().await;
        Ok(states.get(event_id).copied().unwrap_or(PreviewState::None))
    }

    async fn set_event_state(&self, event_id: &EventId, state: PreviewState) -> StoreResult<()> {
        self.event_states
            .write()
            .await
            .insert(event_id.clone(), state);
        Ok(())
    }

    async fn append_credit(&self, mut tx: CreditTransaction) -> StoreResult<CreditTransaction> {
        let mut log = self.credit_log.write().await;
        tx.seq = log.len() as u64 + 1;
        log.push(tx.clone());
        Ok(tx)
    }

    async fn last_credit_for(
        &self,
        player_id: &PlayerId,
    ) -> StoreResult<Option<CreditTransaction>> {
        let log = self.credit_log.read().await;
        Ok(log.iter().rev().find(|t| &t.player_id == player_id).cloned())
    }

    async fn credit_history(&self, player_id: &PlayerId) -> StoreResult<Vec<CreditTransaction>> {
        let log = self.credit_log.read().await;
        Ok(log
            .iter()
            .filter(|t| &t.player_id == player_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuditStore for MemoryStorage {
    async fn append_audit(&self, entry: &AuditLogEntry) -> StoreResult<()> {
        self.audit_log.write().await.push(entry.clone());
        Ok(())
    }

    async fn recent_audit(&self, limit: usize) -> StoreResult<Vec<AuditLogEntry>> {
        let log = self.audit_log.read().await;
        let start = log.len().saturating_sub(limit);
        Ok(log[start..].to_vec())
    }

    async fn audit_for_event(&self, event_id: &EventId) -> StoreResult<Vec<AuditLogEntry>> {
        let log = self.audit_log.read().await;
        Ok(log
            .iter()
            .filter(|e| e.event_id.as_ref() == Some(event_id))
            .cloned()
            .collect())
    }
}
