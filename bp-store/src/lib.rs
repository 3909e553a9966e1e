//! Bonus Points Storage
//!
//! Storage interfaces for the ledger and audit trail, plus two backends:
//! - [`MemoryStorage`]: tokio `RwLock` maps, for tests and dry runs
//! - [`SledStorage`]: embedded sled database with typed, schema-versioned trees
//!
//! Rows are serde structs from `bp-core`; there is no column-name discovery.
//! Every write here is a single durable step. Multi-row consistency comes
//! from the engine's lock, not from storage transactions.

pub mod error;
pub mod memory;
pub mod sled;

use async_trait::async_trait;
use bp_core::types::{
    AuditLogEntry, AwardSource, BatchId, BpTotalRow, CreditTransaction, EventId, PlayerId,
    PreviewArtifact, PreviewState, PrestigeRecord, RedemptionRecord, SourceLedgerRow,
    SpentPoolEntry,
};
use serde::{Deserialize, Serialize};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStorage;
pub use self::sled::SledStorage;

/// Persisted layout version, checked when a sled database is opened
pub const SCHEMA_VERSION: &str = "2";

/// Ledger storage interface
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    // ==================== Source ledgers ====================

    async fn get_source_row(
        &self,
        player_id: &PlayerId,
        source: AwardSource,
    ) -> StoreResult<Option<SourceLedgerRow>>;

    /// Insert or replace the row for `(player_id, source)`
    async fn upsert_source_row(&self, row: &SourceLedgerRow) -> StoreResult<()>;

    /// All source rows for a player
    async fn list_source_rows(&self, player_id: &PlayerId) -> StoreResult<Vec<SourceLedgerRow>>;

    // ==================== Totals ====================

    async fn get_total(&self, player_id: &PlayerId) -> StoreResult<Option<BpTotalRow>>;

    async fn put_total(&self, row: &BpTotalRow) -> StoreResult<()>;

    // ==================== Prestige ====================

    async fn get_prestige(&self, player_id: &PlayerId) -> StoreResult<Option<PrestigeRecord>>;

    async fn put_prestige(&self, record: &PrestigeRecord) -> StoreResult<()>;

    // ==================== Redemptions ====================

    /// Redeemed total for a player (0 when none recorded)
    async fn total_redeemed(&self, player_id: &PlayerId) -> StoreResult<u64>;

    /// Add to a player's redeemed total. Only the external redemption path
    /// calls this; the governor reads [`LedgerStorage::total_redeemed`].
    async fn record_redemption(
        &self,
        player_id: &PlayerId,
        amount: u64,
    ) -> StoreResult<RedemptionRecord>;

    // ==================== Spent pool ====================

    /// Append entries as one write
    async fn append_spent(&self, entries: &[SpentPoolEntry]) -> StoreResult<()>;

    async fn spent_for_event(&self, event_id: &EventId) -> StoreResult<Vec<SpentPoolEntry>>;

    async fn spent_for_batch(&self, batch_id: &BatchId) -> StoreResult<Vec<SpentPoolEntry>>;

    /// Flip `reverted` on every non-reverted entry of the batch.
    /// Returns the entries this call changed, already marked reverted.
    async fn mark_batch_reverted(&self, batch_id: &BatchId) -> StoreResult<Vec<SpentPoolEntry>>;

    // ==================== Previews ====================

    async fn save_preview(&self, artifact: &PreviewArtifact) -> StoreResult<()>;

    /// All stored artifacts for the event, oldest first
    async fn previews_for_event(&self, event_id: &EventId) -> StoreResult<Vec<PreviewArtifact>>;

    /// Protocol state of the event (`None` when never previewed)
    async fn event_state(&self, event_id: &EventId) -> StoreResult<PreviewState>;

    async fn set_event_state(&self, event_id: &EventId, state: PreviewState) -> StoreResult<()>;

    // ==================== Credit log ====================

    /// Append a transaction, assigning the next sequence number
    async fn append_credit(&self, tx: CreditTransaction) -> StoreResult<CreditTransaction>;

    /// Most recent transaction for the player, found by scanning the log backward
    async fn last_credit_for(&self, player_id: &PlayerId)
        -> StoreResult<Option<CreditTransaction>>;

    /// Transactions for the player, in sequence order
    async fn credit_history(&self, player_id: &PlayerId) -> StoreResult<Vec<CreditTransaction>>;
}

/// Append-only audit sink
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(&self, entry: &AuditLogEntry) -> StoreResult<()>;

    /// Last `limit` entries, oldest first
    async fn recent_audit(&self, limit: usize) -> StoreResult<Vec<AuditLogEntry>>;

    /// Entries for one event, oldest first
    async fn audit_for_event(&self, event_id: &EventId) -> StoreResult<Vec<AuditLogEntry>>;
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory
    pub data_dir: String,
    /// Flush to disk after every write
    pub flush_on_write: bool,
    /// Cache size in bytes
    pub cache_capacity: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./bp_data".to_string(),
            flush_on_write: true,
            cache_capacity: 64 * 1024 * 1024,
        }
    }
}

impl StorageConfig {
    pub fn new(data_dir: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }
}
