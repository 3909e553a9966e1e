//! Bonus Points Engine
//!
//! Orchestration over `bp-core` and `bp-store`.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                   BpEngine                    │
//! │  AwardService      (award lock, 4 stages)     │
//! │  PreviewCommitService  (hash compare, no lock)│
//! │  SpentPoolService  (batches, idempotent revert)│
//! │  CreditLedger      (derived balances)         │
//! │  AuditTrail        (non-fatal sink)           │
//! └───────────────────────────────────────────────┘
//!          │                         │
//!          ▼                         ▼
//!     LedgerStorage             AuditStore
//! ```
//!
//! Construct one engine per process: the award lock lives inside it.
//!
//! ```ignore
//! let storage = Arc::new(MemoryStorage::new());
//! let engine = BpEngine::with_storage(BpConfig::default(), storage, Arc::new(roster))?;
//! let result = engine.award(AwardRequest::new("P", 120, "dice")).await;
//! assert_eq!(result.current_bp, 100);
//! ```

pub mod audit;
pub mod award;
pub mod credit;
pub mod identity;
pub mod lock;
pub mod protocol;
pub mod spend;

use bp_core::points::{Governor, PrestigeConverter};
use bp_core::types::{
    AuditLogEntry, BatchId, BpTotalRow, CommitOutcome, Digest, EventId, PlayerId,
    PreviewArtifact, PreviewState, PrestigeRecord, RedemptionRecord,
};
use bp_core::{BpConfig, BpError, BpResult};
use bp_store::{AuditStore, LedgerStorage};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use audit::AuditTrail;
pub use award::{AwardFailure, AwardRequest, AwardResult, AwardService};
pub use credit::CreditLedger;
pub use identity::{IdentityResolver, MatchMethod, Resolution, RosterResolver};
pub use lock::AwardLock;
pub use protocol::{CommitRequest, PreviewCommitService, PreviewRequest};
pub use spend::SpentPoolService;

/// Everything known about one player
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub total: BpTotalRow,
    pub prestige: PrestigeRecord,
    pub total_redeemed: u64,
    pub credit_balance: Decimal,
}

/// Engine facade
pub struct BpEngine {
    config: BpConfig,
    storage: Arc<dyn LedgerStorage>,
    resolver: Arc<dyn IdentityResolver>,
    audit: Arc<AuditTrail>,
    awards: AwardService,
    spend: Arc<SpentPoolService>,
    protocol: PreviewCommitService,
    credit: CreditLedger,
}

impl BpEngine {
    pub fn new(
        config: BpConfig,
        storage: Arc<dyn LedgerStorage>,
        audit_store: Arc<dyn AuditStore>,
        resolver: Arc<dyn IdentityResolver>,
    ) -> BpResult<Self> {
        config.validate()?;

        let audit = Arc::new(AuditTrail::new(audit_store, config.store_id.clone()));
        let lock = Arc::new(AwardLock::new(config.lock_timeout()));
        let awards = AwardService::new(storage.clone(), resolver.clone(), audit.clone(), lock)
            .with_governor(Governor::with_cap(config.cap))
            .with_converter(PrestigeConverter::new(config.prestige_ratio));
        let spend = Arc::new(SpentPoolService::new(storage.clone(), audit.clone()));
        let protocol = PreviewCommitService::new(
            storage.clone(),
            spend.clone(),
            audit.clone(),
            config.preview_ttl(),
        );
        let credit = CreditLedger::new(storage.clone(), audit.clone());

        Ok(Self {
            config,
            storage,
            resolver,
            audit,
            awards,
            spend,
            protocol,
            credit,
        })
    }

    /// One backend serving both ledger and audit
    pub fn with_storage<S>(
        config: BpConfig,
        storage: Arc<S>,
        resolver: Arc<dyn IdentityResolver>,
    ) -> BpResult<Self>
    where
        S: LedgerStorage + AuditStore + 'static,
    {
        Self::new(config, storage.clone(), storage, resolver)
    }

    pub fn config(&self) -> &BpConfig {
        &self.config
    }

    pub fn awards(&self) -> &AwardService {
        &self.awards
    }

    pub fn spend(&self) -> &SpentPoolService {
        &self.spend
    }

    pub fn protocol(&self) -> &PreviewCommitService {
        &self.protocol
    }

    pub fn credit(&self) -> &CreditLedger {
        &self.credit
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn resolve_player(&self, input: &str) -> BpResult<PlayerId> {
        self.resolver
            .resolve(input)
            .map(|r| r.player_id)
            .ok_or_else(|| BpError::PlayerNotFound {
                input: input.trim().to_string(),
            })
    }

    // ==================== Awards ====================

    pub async fn award(&self, request: AwardRequest) -> AwardResult {
        self.awards.award(request).await
    }

    pub async fn resync(&self, player: &str, operator: &str) -> AwardResult {
        self.awards.resync(player, operator).await
    }

    pub async fn player_summary(&self, player: &str) -> BpResult<PlayerSummary> {
        let player_id = self.resolve_player(player)?;
        let total = self
            .storage
            .get_total(&player_id)
            .await?
            .unwrap_or_else(|| BpTotalRow::new(player_id.clone()));
        let prestige = self
            .storage
            .get_prestige(&player_id)
            .await?
            .unwrap_or_else(|| PrestigeRecord::new(player_id.clone()));
        let total_redeemed = self.storage.total_redeemed(&player_id).await?;
        let credit_balance = self.credit.balance(&player_id).await?;

        Ok(PlayerSummary {
            player_id,
            total,
            prestige,
            total_redeemed,
            credit_balance,
        })
    }

    /// Write path of the external redemption service. The governor picks the
    /// new total up on the player's next award or resync.
    pub async fn record_redemption(&self, player: &str, amount: u64) -> BpResult<RedemptionRecord> {
        let player_id = self.resolve_player(player)?;
        Ok(self.storage.record_redemption(&player_id, amount).await?)
    }

    // ==================== Preview / commit ====================

    pub fn hash_allocation<T: Serialize>(&self, allocation: &T) -> BpResult<Digest> {
        self.protocol.hash_allocation(allocation)
    }

    pub async fn preview<T: Serialize>(
        &self,
        request: PreviewRequest<T>,
    ) -> BpResult<PreviewArtifact> {
        self.protocol.preview(request).await
    }

    pub async fn commit(&self, request: CommitRequest) -> BpResult<CommitOutcome> {
        self.protocol.commit(request).await
    }

    pub async fn preview_state(&self, event_id: &EventId) -> BpResult<PreviewState> {
        self.protocol.state(event_id).await
    }

    // ==================== Spent pool ====================

    pub async fn event_spent(&self, event_id: &EventId) -> BpResult<u64> {
        self.spend.get_event_spent(event_id).await
    }

    pub async fn revert_batch(&self, batch_id: &BatchId, operator: &str) -> BpResult<usize> {
        self.spend.revert_batch(batch_id, operator).await
    }

    // ==================== Audit ====================

    pub async fn audit_tail(&self, limit: usize) -> BpResult<Vec<AuditLogEntry>> {
        self.audit.tail(limit).await
    }

    pub async fn audit_for_event(&self, event_id: &EventId) -> BpResult<Vec<AuditLogEntry>> {
        self.audit.for_event(event_id).await
    }

    /// Audit writes dropped since start-up
    pub fn audit_failures(&self) -> u64 {
        self.audit.failure_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp_store::MemoryStorage;

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        let result = BpEngine::with_storage(
            BpConfig::default().with_cap(0),
            storage,
            Arc::new(RosterResolver::default()),
        );
        assert!(matches!(result, Err(BpError::Config(_))));
    }

    #[tokio::test]
    async fn test_summary_for_new_player() {
        let storage = Arc::new(MemoryStorage::new());
        let engine = BpEngine::with_storage(
            BpConfig::test(),
            storage,
            Arc::new(RosterResolver::new(["P"])),
        )
        .unwrap();

        let summary = engine.player_summary("p").await.unwrap();
        assert_eq!(summary.player_id, PlayerId::new("P"));
        assert_eq!(summary.total.current_bp, 0);
        assert_eq!(summary.credit_balance, Decimal::ZERO);
    }
}
