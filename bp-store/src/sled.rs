//! Sled Persistent Storage
//!
//! One tree per row type. Keys:
//! - `source_rows`: `{player}\0{source}`
//! - `totals`, `prestige`, `redemptions`: `{player}`
//! - `spent`: `{batch}\0{index:08}` (batch ids sort by creation time)
//! - `previews`: `{event}\0{created_millis:be}{preview_id}`
//! - `event_states`: `{event}`
//! - `credit_log`, `audit_log`: generated id, big-endian
//! - `meta`: `schema_version`

use async_trait::async_trait;
use bp_core::types::{
    AuditLogEntry, AwardSource, BatchId, BpTotalRow, CreditTransaction, EventId, PlayerId,
    PreviewArtifact, PreviewState, PrestigeRecord, RedemptionRecord, SourceLedgerRow,
    SpentPoolEntry,
};
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::{AuditStore, LedgerStorage, StorageConfig, SCHEMA_VERSION};

/// Tree names
const SOURCE_ROWS_TREE: &str = "source_rows";
const TOTALS_TREE: &str = "totals";
const PRESTIGE_TREE: &str = "prestige";
const REDEMPTIONS_TREE: &str = "redemptions";
const SPENT_TREE: &str = "spent";
const PREVIEWS_TREE: &str = "previews";
const EVENT_STATES_TREE: &str = "event_states";
const CREDIT_LOG_TREE: &str = "credit_log";
const AUDIT_LOG_TREE: &str = "audit_log";
const META_TREE: &str = "meta";

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";
const KEY_SEP: u8 = 0;

/// Sled-backed storage
#[derive(Debug, Clone)]
pub struct SledStorage {
    db: sled::Db,
    source_rows: sled::Tree,
    totals: sled::Tree,
    prestige: sled::Tree,
    redemptions: sled::Tree,
    spent: sled::Tree,
    previews: sled::Tree,
    event_states: sled::Tree,
    credit_log: sled::Tree,
    audit_log: sled::Tree,
    flush_on_write: bool,
}

impl SledStorage {
    /// Open with configuration
    pub fn new(config: &StorageConfig) -> StoreResult<Self> {
        let db = sled::Config::new()
            .path(&config.data_dir)
            .cache_capacity(config.cache_capacity)
            .open()
            .map_err(|e| StoreError::database("Failed to open sled db", e))?;
        Self::from_db(db, config.flush_on_write)
    }

    /// Open or create a database at `path` with default settings
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path).map_err(|e| StoreError::database("Failed to open sled db", e))?;
        Self::from_db(db, true)
    }

    fn from_db(db: sled::Db, flush_on_write: bool) -> StoreResult<Self> {
        let open = |name: &str| {
            db.open_tree(name)
                .map_err(|e| StoreError::database(&format!("Failed to open {} tree", name), e))
        };

        let meta = open(META_TREE)?;
        Self::check_schema(&meta)?;

        Ok(Self {
            source_rows: open(SOURCE_ROWS_TREE)?,
            totals: open(TOTALS_TREE)?,
            prestige: open(PRESTIGE_TREE)?,
            redemptions: open(REDEMPTIONS_TREE)?,
            spent: open(SPENT_TREE)?,
            previews: open(PREVIEWS_TREE)?,
            event_states: open(EVENT_STATES_TREE)?,
            credit_log: open(CREDIT_LOG_TREE)?,
            audit_log: open(AUDIT_LOG_TREE)?,
            db,
            flush_on_write,
        })
    }

    /// Stamp a fresh database; reject one written by a different layout
    fn check_schema(meta: &sled::Tree) -> StoreResult<()> {
        match meta.get(SCHEMA_VERSION_KEY)? {
            None => {
                meta.insert(SCHEMA_VERSION_KEY, SCHEMA_VERSION.as_bytes())?;
                info!(schema_version = SCHEMA_VERSION, "Initialised new ledger database");
                Ok(())
            }
            Some(found) if found.as_ref() == SCHEMA_VERSION.as_bytes() => Ok(()),
            Some(found) => Err(StoreError::SchemaMismatch {
                expected: SCHEMA_VERSION.to_string(),
                found: String::from_utf8_lossy(&found).into_owned(),
            }),
        }
    }

    /// Flush to disk
    pub async fn flush(&self) -> StoreResult<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| StoreError::database("Failed to flush db", e))?;
        Ok(())
    }

    async fn after_write(&self) -> StoreResult<()> {
        if self.flush_on_write {
            self.flush().await?;
        }
        Ok(())
    }

    // ==================== Helpers ====================

    fn serialize<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn get_json<T: DeserializeOwned>(tree: &sled::Tree, key: &[u8]) -> StoreResult<Option<T>> {
        match tree.get(key)? {
            Some(bytes) => Ok(Some(Self::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_json<T: DeserializeOwned>(tree: &sled::Tree, prefix: &[u8]) -> StoreResult<Vec<T>> {
        tree.scan_prefix(prefix)
            .map(|item| {
                let (_, value) = item?;
                Self::deserialize(&value)
            })
            .collect()
    }

    fn prefixed(first: &str) -> Vec<u8> {
        let mut key = first.as_bytes().to_vec();
        key.push(KEY_SEP);
        key
    }

    fn source_key(player_id: &PlayerId, source: AwardSource) -> Vec<u8> {
        let mut key = Self::prefixed(player_id.as_str());
        key.extend_from_slice(source.as_str().as_bytes());
        key
    }

    fn spent_key(batch_id: &BatchId, index: usize) -> Vec<u8> {
        let mut key = Self::prefixed(batch_id.as_str());
        key.extend_from_slice(format!("{:08}", index).as_bytes());
        key
    }

    fn preview_key(artifact: &PreviewArtifact) -> Vec<u8> {
        let mut key = Self::prefixed(artifact.event_id.as_str());
        key.extend_from_slice(&artifact.created_at.timestamp_millis().to_be_bytes());
        key.extend_from_slice(artifact.id.as_str().as_bytes());
        key
    }

    fn next_log_key(&self) -> StoreResult<(u64, [u8; 8])> {
        let id = self.db.generate_id()?;
        Ok((id, id.to_be_bytes()))
    }
}

#[async_trait]
impl LedgerStorage for SledStorage {
    async fn get_source_row(
        &self,
        player_id: &PlayerId,
        source: AwardSource,
    ) -> StoreResult<Option<SourceLedgerRow>> {
        Self::get_json(&self.source_rows, &Self::source_key(player_id, source))
    }

    async fn upsert_source_row(&self, row: &SourceLedgerRow) -> StoreResult<()> {
        let key = Self::source_key(&row.player_id, row.source);
        self.source_rows.insert(key, Self::serialize(row)?)?;
        self.after_write().await
    }

    async fn list_source_rows(&self, player_id: &PlayerId) -> StoreResult<Vec<SourceLedgerRow>> {
        Self::scan_json(&self.source_rows, &Self::prefixed(player_id.as_str()))
    }

    async fn get_total(&self, player_id: &PlayerId) -> StoreResult<Option<BpTotalRow>> {
        Self::get_json(&self.totals, player_id.as_str().as_bytes())
    }

    async fn put_total(&self, row: &BpTotalRow) -> StoreResult<()> {
        self.totals
            .insert(row.player_id.as_str().as_bytes(), Self::serialize(row)?)?;
        self.after_write().await
    }

    async fn get_prestige(&self, player_id: &PlayerId) -> StoreResult<Option<PrestigeRecord>> {
        Self::get_json(&self.prestige, player_id.as_str().as_bytes())
    }

    async fn put_prestige(&self, record: &PrestigeRecord) -> StoreResult<()> {
        self.prestige
            .insert(record.player_id.as_str().as_bytes(), Self::serialize(record)?)?;
        self.after_write().await
    }

    async fn total_redeemed(&self, player_id: &PlayerId) -> StoreResult<u64> {
        let record: Option<RedemptionRecord> =
            Self::get_json(&self.redemptions, player_id.as_str().as_bytes())?;
        Ok(record.map(|r| r.total_redeemed).unwrap_or(0))
    }

    async fn record_redemption(
        &self,
        player_id: &PlayerId,
        amount: u64,
    ) -> StoreResult<RedemptionRecord> {
        let key = player_id.as_str().as_bytes();
        let mut record: RedemptionRecord = Self::get_json(&self.redemptions, key)?
            .unwrap_or_else(|| RedemptionRecord::new(player_id.clone()));
        record.total_redeemed = record.total_redeemed.saturating_add(amount);
        record.last_updated = Utc::now();
        self.redemptions.insert(key, Self::serialize(&record)?)?;
        self.after_write().await?;
        Ok(record)
    }

    async fn append_spent(&self, entries: &[SpentPoolEntry]) -> StoreResult<()> {
        let mut batch = sled::Batch::default();
        let mut next_index: std::collections::HashMap<&BatchId, usize> = Default::default();
        for entry in entries {
            let index = match next_index.get(&entry.batch_id) {
                Some(i) => *i,
                None => self.spent.scan_prefix(Self::prefixed(entry.batch_id.as_str())).count(),
            };
            next_index.insert(&entry.batch_id, index + 1);
            batch.insert(Self::spent_key(&entry.batch_id, index), Self::serialize(entry)?);
        }
        self.spent.apply_batch(batch)?;
        debug!(count = entries.len(), "Spent entries appended");
        self.after_write().await
    }

    async fn spent_for_event(&self, event_id: &EventId) -> StoreResult<Vec<SpentPoolEntry>> {
        let all: Vec<SpentPoolEntry> = Self::scan_json(&self.spent, &[])?;
        Ok(all.into_iter().filter(|e| &e.event_id == event_id).collect())
    }

    async fn spent_for_batch(&self, batch_id: &BatchId) -> StoreResult<Vec<SpentPoolEntry>> {
        Self::scan_json(&self.spent, &Self::prefixed(batch_id.as_str()))
    }

    async fn mark_batch_reverted(&self, batch_id: &BatchId) -> StoreResult<Vec<SpentPoolEntry>> {
        let mut flipped = Vec::new();
        for item in self.spent.scan_prefix(Self::prefixed(batch_id.as_str())) {
            let (key, old) = item?;
            let mut entry: SpentPoolEntry = Self::deserialize(&old)?;
            if !entry.mark_reverted() {
                continue;
            }
            // Only the caller whose swap lands gets to report the entry
            let swapped = self
                .spent
                .compare_and_swap(&key, Some(&old), Some(Self::serialize(&entry)?))?;
            if swapped.is_ok() {
                flipped.push(entry);
            }
        }
        if !flipped.is_empty() {
            self.after_write().await?;
        }
        Ok(flipped)
    }

    async fn save_preview(&self, artifact: &PreviewArtifact) -> StoreResult<()> {
        self.previews
            .insert(Self::preview_key(artifact), Self::serialize(artifact)?)?;
        self.after_write().await
    }

    async fn previews_for_event(&self, event_id: &EventId) -> StoreResult<Vec<PreviewArtifact>> {
        Self::scan_json(&self.previews, &Self::prefixed(event_id.as_str()))
    }

    async fn event_state(&self, event_id: &EventId) -> StoreResult<PreviewState> {
        let state: Option<PreviewState> =
            Self::get_json(&self.event_states, event_id.as_str().as_bytes())?;
        Ok(state.unwrap_or(PreviewState::None))
    }

    async fn set_event_state(&self, event_id: &EventId, state: PreviewState) -> StoreResult<()> {
        self.event_states
            .insert(event_id.as_str().as_bytes(), Self::serialize(&state)?)?;
        self.after_write().await
    }

    async fn append_credit(&self, mut tx: CreditTransaction) -> StoreResult<CreditTransaction> {
        let (seq, key) = self.next_log_key()?;
        tx.seq = seq;
        self.credit_log.insert(key, Self::serialize(&tx)?)?;
        self.after_write().await?;
        Ok(tx)
    }

    async fn last_credit_for(
        &self,
        player_id: &PlayerId,
    ) -> StoreResult<Option<CreditTransaction>> {
        for item in self.credit_log.iter().rev() {
            let (_, value) = item?;
            let tx: CreditTransaction = Self::deserialize(&value)?;
            if &tx.player_id == player_id {
                return Ok(Some(tx));
            }
        }
        Ok(None)
    }

    async fn credit_history(&self, player_id: &PlayerId) -> StoreResult<Vec<CreditTransaction>> {
        let all: Vec<CreditTransaction> = Self::scan_json(&self.credit_log, &[])?;
        Ok(all.into_iter().filter(|t| &t.player_id == player_id).collect())
    }
}

#[async_trait]
impl AuditStore for SledStorage {
    async fn append_audit(&self, entry: &AuditLogEntry) -> StoreResult<()> {
        let (_, key) = self.next_log_key()?;
        self.audit_log.insert(key, Self::serialize(entry)?)?;
        self.after_write().await
    }

    async fn recent_audit(&self, limit: usize) -> StoreResult<Vec<AuditLogEntry>> {
        let mut out = self
            .audit_log
            .iter()
            .rev()
            .take(limit)
            .map(|item| {
                let (_, value) = item?;
                Self::deserialize(&value)
            })
            .collect::<StoreResult<Vec<AuditLogEntry>>>()?;
        out.reverse();
        Ok(out)
    }

    async fn audit_for_event(&self, event_id: &EventId) -> StoreResult<Vec<AuditLogEntry>> {
        let all: Vec<AuditLogEntry> = Self::scan_json(&self.audit_log, &[])?;
        Ok(all
            .into_iter()
            .filter(|e| e.event_id.as_ref() == Some(event_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp_core::types::{AuditAction, AuditStatus, Digest, SpendLineItem};
    use tempfile::tempdir;

    fn spent(event: &str, batch: &str, qty: u32) -> SpentPoolEntry {
        SpentPoolEntry::from_line(
            &EventId::new(event),
            "prize_draw",
            &BatchId::new(batch),
            &SpendLineItem::new("ITEM", qty, 10),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_sled_totals_survive_reopen() {
        let dir = tempdir().unwrap();
        let player = PlayerId::new("p1");
        {
            let storage = SledStorage::open(dir.path()).unwrap();
            let mut row = BpTotalRow::new(player.clone());
            row.historical_bp = 120;
            row.current_bp = 100;
            storage.put_total(&row).await.unwrap();
        }

        let storage = SledStorage::open(dir.path()).unwrap();
        let row = storage.get_total(&player).await.unwrap().unwrap();
        assert_eq!(row.historical_bp, 120);
        assert_eq!(row.current_bp, 100);
    }

    #[tokio::test]
    async fn test_sled_schema_mismatch_rejected() {
        let dir = tempdir().unwrap();
        {
            let db = sled::open(dir.path()).unwrap();
            let meta = db.open_tree(META_TREE).unwrap();
            meta.insert(SCHEMA_VERSION_KEY, b"0".as_ref()).unwrap();
            db.flush().unwrap();
        }

        let err = SledStorage::open(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { .. }));
    }

    #[tokio::test]
    async fn test_sled_source_rows_by_player() {
        let dir = tempdir().unwrap();
        let storage = SledStorage::open(dir.path()).unwrap();
        let p1 = PlayerId::new("p1");
        let p10 = PlayerId::new("p10");

        storage
            .upsert_source_row(&SourceLedgerRow::new(p1.clone(), AwardSource::DiceRoll, 4))
            .await
            .unwrap();
        storage
            .upsert_source_row(&SourceLedgerRow::new(p10.clone(), AwardSource::DiceRoll, 9))
            .await
            .unwrap();

        // "p1" must not pick up "p10" rows
        let rows = storage.list_source_rows(&p1).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].points, 4);
    }

    #[tokio::test]
    async fn test_sled_spent_and_revert() {
        let dir = tempdir().unwrap();
        let storage = SledStorage::open(dir.path()).unwrap();

        storage
            .append_spent(&[spent("E1", "B1", 1), spent("E1", "B1", 2)])
            .await
            .unwrap();
        storage.append_spent(&[spent("E1", "B2", 3)]).await.unwrap();

        let batch = BatchId::new("B1");
        assert_eq!(storage.spent_for_batch(&batch).await.unwrap().len(), 2);
        assert_eq!(storage.mark_batch_reverted(&batch).await.unwrap().len(), 2);
        assert!(storage.mark_batch_reverted(&batch).await.unwrap().is_empty());

        let event = storage.spent_for_event(&EventId::new("E1")).await.unwrap();
        assert_eq!(event.len(), 3);
        assert_eq!(bp_core::types::active_total(&event), 30);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sled_concurrent_reverts_flip_each_entry_once() {
        let dir = tempdir().unwrap();
        let storage = SledStorage::open(dir.path()).unwrap();
        let entries: Vec<_> = (1..=6).map(|qty| spent("E1", "B1", qty)).collect();
        storage.append_spent(&entries).await.unwrap();

        let batch = BatchId::new("B1");
        let mut handles = Vec::new();
        for _ in 0..8 {
            let storage = storage.clone();
            let batch = batch.clone();
            handles.push(tokio::spawn(async move {
                storage.mark_batch_reverted(&batch).await.unwrap()
            }));
        }

        let mut flipped = Vec::new();
        for handle in handles {
            flipped.extend(handle.await.unwrap());
        }
        assert_eq!(flipped.len(), 6);
        let mut qtys: Vec<_> = flipped.iter().map(|e| e.qty).collect();
        qtys.sort_unstable();
        assert_eq!(qtys, vec![1, 2, 3, 4, 5, 6]);

        let after = storage.spent_for_batch(&batch).await.unwrap();
        assert!(after.iter().all(|e| e.reverted));
    }

    #[tokio::test]
    async fn test_sled_previews_and_audit() {
        let dir = tempdir().unwrap();
        let storage = SledStorage::open(dir.path()).unwrap();
        let event = EventId::new("E1");

        let artifact = PreviewArtifact::new(
            event.clone(),
            Some("seed-1".into()),
            Digest::sha256(b"plan"),
            Utc::now(),
            chrono::Duration::hours(24),
        );
        storage.save_preview(&artifact).await.unwrap();
        assert_eq!(storage.previews_for_event(&event).await.unwrap(), vec![artifact]);
        assert_eq!(storage.event_state(&event).await.unwrap(), PreviewState::None);
        storage
            .set_event_state(&event, PreviewState::Previewed)
            .await
            .unwrap();
        assert_eq!(storage.event_state(&event).await.unwrap(), PreviewState::Previewed);

        for action in [AuditAction::Preview, AuditAction::Commit] {
            let entry = AuditLogEntry::new("main", action, AuditStatus::Success)
                .with_event(event.clone());
            storage.append_audit(&entry).await.unwrap();
        }
        let tail = storage.recent_audit(10).await.unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[1].action, AuditAction::Commit);
        assert_eq!(storage.audit_for_event(&event).await.unwrap().len(), 2);
    }
}
