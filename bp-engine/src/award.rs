//! Award Pipeline
//!
//! validate -> resolve -> lock -> source write -> aggregate -> governor ->
//! prestige -> unlock -> audit
//!
//! Stages write straight to storage with no surrounding transaction. A
//! failure names the stage that did not complete; everything before it is
//! already durable and [`AwardService::resync`] re-derives the rest.

use bp_core::points::{Aggregator, Governor, GovernorOutcome, PrestigeConverter};
use bp_core::types::{
    tags, AuditAction, AuditStatus, AwardSource, Band, BpTotalRow, PlayerId, PrestigeRecord,
    SourceLedgerRow,
};
use bp_core::{BpError, BpResult, PipelineStage};
use bp_store::LedgerStorage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::audit::AuditTrail;
use crate::identity::{IdentityResolver, Resolution};
use crate::lock::AwardLock;

/// Award request as it arrives from an operator
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AwardRequest {
    /// Free-form player identifier
    pub player: String,
    /// Must be positive
    pub amount: i64,
    /// Source name, e.g. `dice_roll`
    pub source: String,
    pub operator: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl AwardRequest {
    pub fn new(player: impl Into<String>, amount: i64, source: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            amount,
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = operator.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Checked before anything is touched
    fn validate(&self) -> BpResult<(u64, AwardSource)> {
        if self.player.trim().is_empty() {
            return Err(BpError::invalid_input("player identifier must not be empty"));
        }
        if self.amount <= 0 {
            return Err(BpError::invalid_input(format!(
                "amount must be a positive integer, got {}",
                self.amount
            )));
        }
        let source = AwardSource::parse(&self.source)?;
        Ok((self.amount as u64, source))
    }
}

/// Structured failure carried inside an [`AwardResult`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardFailure {
    pub code: String,
    /// Set when a pipeline stage failed after earlier stages committed
    pub stage: Option<PipelineStage>,
    pub message: String,
}

impl From<&BpError> for AwardFailure {
    fn from(err: &BpError) -> Self {
        let stage = match err {
            BpError::StageFailure { stage, .. } => Some(*stage),
            _ => None,
        };
        Self {
            code: err.code().to_string(),
            stage,
            message: err.to_string(),
        }
    }
}

/// Outcome of an award or resync. Failures are values, never panics or `Err`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardResult {
    pub success: bool,
    /// Resolved id; `None` when validation or resolution failed
    pub player_id: Option<PlayerId>,
    /// Spendable balance after the cap and redemptions
    pub current_bp: u64,
    /// Capped lifetime total
    pub historical_bp: u64,
    /// Prestige level after conversion
    pub prestige: u64,
    /// Cumulative historical points above the cap
    pub overflow: u64,
    /// Rule codes applied by this run
    pub tags: Vec<String>,
    /// Set exactly when `success` is false
    pub failure: Option<AwardFailure>,
}

impl AwardResult {
    fn failed(player_id: Option<PlayerId>, err: &BpError) -> Self {
        Self {
            success: false,
            player_id,
            current_bp: 0,
            historical_bp: 0,
            prestige: 0,
            overflow: 0,
            tags: Vec::new(),
            failure: Some(AwardFailure::from(err)),
        }
    }

    pub fn failed_stage(&self) -> Option<PipelineStage> {
        self.failure.as_ref().and_then(|f| f.stage)
    }
}

/// What one locked pipeline run produced
#[derive(Clone, Debug)]
struct PipelineRun {
    total: BpTotalRow,
    governor: GovernorOutcome,
    prestige: PrestigeRecord,
    /// Overflow handed to the converter by this run
    converted: u64,
    leveled_up: bool,
}

impl PipelineRun {
    fn tags(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.governor.capped {
            out.push(tags::CAP);
        }
        if self.converted > 0 {
            out.push(tags::OVERFLOW);
        }
        if self.leveled_up {
            out.push(tags::PRESTIGE_UP);
        }
        out
    }
}

/// Award service.
///
/// The three pipeline stages are injected; there is exactly one of each per
/// service.
pub struct AwardService {
    storage: Arc<dyn LedgerStorage>,
    resolver: Arc<dyn IdentityResolver>,
    audit: Arc<AuditTrail>,
    lock: Arc<AwardLock>,
    aggregator: Aggregator,
    governor: Governor,
    converter: PrestigeConverter,
}

impl AwardService {
    pub fn new(
        storage: Arc<dyn LedgerStorage>,
        resolver: Arc<dyn IdentityResolver>,
        audit: Arc<AuditTrail>,
        lock: Arc<AwardLock>,
    ) -> Self {
        Self {
            storage,
            resolver,
            audit,
            lock,
            aggregator: Aggregator::new(),
            governor: Governor::default(),
            converter: PrestigeConverter::default(),
        }
    }

    pub fn with_governor(mut self, governor: Governor) -> Self {
        self.governor = governor;
        self
    }

    pub fn with_converter(mut self, converter: PrestigeConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Apply an award
    pub async fn award(&self, request: AwardRequest) -> AwardResult {
        let started = Instant::now();

        let (delta, source) = match request.validate() {
            Ok(v) => v,
            Err(e) => {
                warn!(operation = "award", error = %e, "Award rejected");
                return AwardResult::failed(None, &e);
            }
        };

        let resolution = match self.resolve(&request.player) {
            Ok(r) => r,
            Err(e) => {
                warn!(operation = "award", error = %e, "Award rejected");
                return AwardResult::failed(None, &e);
            }
        };
        let player_id = resolution.player_id.clone();

        let run = {
            let _guard = match self.lock.acquire().await {
                Ok(g) => g,
                Err(e) => return AwardResult::failed(Some(player_id), &e),
            };
            self.run_pipeline(&player_id, Some((source, delta))).await
        };

        let details = serde_json::json!({
            "source": source.as_str(),
            "delta": delta,
            "metadata": request.metadata,
        });
        let result = self
            .finish(AuditAction::Award, &request.operator, &resolution, run, details)
            .await;

        if result.success {
            info!(
                operation = "award",
                player_id = %player_id,
                source = %source,
                delta,
                current_bp = result.current_bp,
                overflow = result.overflow,
                duration_ms = started.elapsed().as_millis() as u64,
                "Award applied"
            );
        }
        result
    }

    /// Re-run aggregate and governor with a zero delta.
    ///
    /// Repairs the derived rows after a mid-pipeline failure. Prestige runs
    /// only if overflow is still owed to the converter.
    pub async fn resync(&self, player: &str, operator: &str) -> AwardResult {
        let resolution = match self.resolve(player) {
            Ok(r) => r,
            Err(e) => return AwardResult::failed(None, &e),
        };
        let player_id = resolution.player_id.clone();

        let run = {
            let _guard = match self.lock.acquire().await {
                Ok(g) => g,
                Err(e) => return AwardResult::failed(Some(player_id), &e),
            };
            self.run_pipeline(&player_id, None).await
        };

        let result = self
            .finish(AuditAction::Resync, operator, &resolution, run, serde_json::json!({}))
            .await;
        if result.success {
            info!(operation = "resync", player_id = %player_id, "Resync complete");
        }
        result
    }

    fn resolve(&self, input: &str) -> BpResult<Resolution> {
        self.resolver
            .resolve(input)
            .ok_or_else(|| BpError::PlayerNotFound {
                input: input.trim().to_string(),
            })
    }

    /// Caller holds the award lock
    async fn run_pipeline(
        &self,
        player_id: &PlayerId,
        award: Option<(AwardSource, u64)>,
    ) -> BpResult<PipelineRun> {
        if let Some((source, delta)) = award {
            self.write_source(player_id, source, delta)
                .await
                .map_err(|e| BpError::stage(PipelineStage::SourceWrite, e))?;
            debug!(player_id = %player_id, stage = "source_write", "Stage complete");
        }

        let mut total = self
            .aggregate(player_id)
            .await
            .map_err(|e| BpError::stage(PipelineStage::Aggregate, e))?;
        debug!(player_id = %player_id, raw_total = total.raw_total, stage = "aggregate", "Stage complete");

        let governor = self
            .govern(&mut total)
            .await
            .map_err(|e| BpError::stage(PipelineStage::Governor, e))?;
        debug!(
            player_id = %player_id,
            historical_bp = governor.historical_bp,
            current_bp = governor.current_bp,
            stage = "governor",
            "Stage complete"
        );

        let (prestige, converted, leveled_up) = self
            .convert(player_id, &governor)
            .await
            .map_err(|e| BpError::stage(PipelineStage::Prestige, e))?;

        Ok(PipelineRun {
            total,
            governor,
            prestige,
            converted,
            leveled_up,
        })
    }

    async fn write_source(
        &self,
        player_id: &PlayerId,
        source: AwardSource,
        delta: u64,
    ) -> BpResult<()> {
        let row = match self.storage.get_source_row(player_id, source).await? {
            Some(mut row) => {
                row.add(delta);
                row
            }
            None => SourceLedgerRow::new(player_id.clone(), source, delta),
        };
        self.storage.upsert_source_row(&row).await?;
        Ok(())
    }

    async fn aggregate(&self, player_id: &PlayerId) -> BpResult<BpTotalRow> {
        let rows = self.storage.list_source_rows(player_id).await?;
        let result = self.aggregator.aggregate(&rows);

        let mut total = self
            .storage
            .get_total(player_id)
            .await?
            .unwrap_or_else(|| BpTotalRow::new(player_id.clone()));
        self.aggregator.apply(&mut total, &result);
        self.storage.put_total(&total).await?;
        Ok(total)
    }

    async fn govern(&self, total: &mut BpTotalRow) -> BpResult<GovernorOutcome> {
        let redeemed = self.storage.total_redeemed(&total.player_id).await?;
        let outcome = self
            .governor
            .evaluate(total.raw_total, total.historical_bp, redeemed);
        self.governor.apply(total, &outcome);
        self.storage.put_total(total).await?;
        Ok(outcome)
    }

    /// Converts whatever overflow the record has not yet covered, including
    /// overflow left behind by an earlier failed run
    async fn convert(
        &self,
        player_id: &PlayerId,
        governor: &GovernorOutcome,
    ) -> BpResult<(PrestigeRecord, u64, bool)> {
        let mut record = self
            .storage
            .get_prestige(player_id)
            .await?
            .unwrap_or_else(|| PrestigeRecord::new(player_id.clone()));
        let overflow = self
            .governor
            .unconverted_overflow(governor, record.converted_through_bp);
        if overflow == 0 {
            return Ok((record, 0, false));
        }

        let conversion = self
            .converter
            .convert(&mut record, overflow, governor.historical_bp);
        self.storage.put_prestige(&record).await?;
        debug!(
            player_id = %player_id,
            overflow,
            prestige = record.prestige,
            stage = "prestige",
            "Stage complete"
        );
        Ok((record, overflow, conversion.leveled_up()))
    }

    /// Audit outside the lock, then build the caller's result
    async fn finish(
        &self,
        action: AuditAction,
        operator: &str,
        resolution: &Resolution,
        run: BpResult<PipelineRun>,
        details: serde_json::Value,
    ) -> AwardResult {
        let player_id = resolution.player_id.clone();

        match run {
            Ok(run) => {
                let mut tag_list: Vec<String> = run.tags().into_iter().map(String::from).collect();
                if resolution.is_fuzzy() {
                    tag_list.push(tags::FUZZY_MATCH.to_string());
                }
                let band = if resolution.is_fuzzy() || run.governor.capped {
                    Band::Amber
                } else {
                    Band::Green
                };

                let mut details = details;
                if let Some(map) = details.as_object_mut() {
                    map.insert("raw_total".into(), run.governor.raw_total.into());
                    map.insert("historical_bp".into(), run.governor.historical_bp.into());
                    map.insert("current_bp".into(), run.governor.current_bp.into());
                    map.insert("overflow".into(), run.governor.overflow.into());
                    map.insert("prestige".into(), run.prestige.prestige.into());
                }

                let mut entry = self
                    .audit
                    .entry(action, AuditStatus::Success)
                    .with_operator(operator)
                    .with_player(player_id.clone())
                    .with_band(band)
                    .with_details(details.to_string());
                for tag in &tag_list {
                    entry = entry.with_tag(tag.clone());
                }
                self.audit.record(entry).await;

                AwardResult {
                    success: true,
                    player_id: Some(player_id),
                    current_bp: run.total.current_bp,
                    historical_bp: run.total.historical_bp,
                    prestige: run.prestige.prestige,
                    overflow: run.governor.overflow,
                    tags: tag_list,
                    failure: None,
                }
            }
            Err(e) => {
                warn!(
                    operation = %action,
                    player_id = %player_id,
                    error = %e,
                    "Pipeline failed"
                );
                let entry = self
                    .audit
                    .entry(action, AuditStatus::Failure)
                    .with_operator(operator)
                    .with_player(player_id.clone())
                    .with_band(Band::Red)
                    .with_details(e.to_string());
                self.audit.record(entry).await;
                AwardResult::failed(Some(player_id), &e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::RosterResolver;
    use bp_store::{AuditStore, MemoryStorage};
    use std::time::Duration;

    fn service() -> (AwardService, Arc<MemoryStorage>, Arc<AwardLock>) {
        let storage = Arc::new(MemoryStorage::new());
        let audit = Arc::new(AuditTrail::new(storage.clone(), "test"));
        let lock = Arc::new(AwardLock::new(Duration::from_millis(50)));
        let svc = AwardService::new(
            storage.clone(),
            Arc::new(RosterResolver::new(["P", "Alice-01"])),
            audit,
            lock.clone(),
        );
        (svc, storage, lock)
    }

    #[tokio::test]
    async fn test_invalid_input_touches_nothing() {
        let (svc, storage, _) = service();

        for req in [
            AwardRequest::new("", 5, "dice"),
            AwardRequest::new("P", 0, "dice"),
            AwardRequest::new("P", -3, "dice"),
            AwardRequest::new("P", 5, "karaoke"),
        ] {
            let result = svc.award(req).await;
            assert!(!result.success);
            assert_eq!(result.failure.unwrap().code, "BP-AWARD-001");
        }
        assert!(storage.get_total(&PlayerId::new("P")).await.unwrap().is_none());
        assert_eq!(storage.audit_len().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_player() {
        let (svc, _, _) = service();
        let result = svc.award(AwardRequest::new("nobody", 5, "dice")).await;
        assert_eq!(result.failure.unwrap().code, "BP-AWARD-002");
    }

    #[tokio::test]
    async fn test_lock_timeout_no_mutation() {
        let (svc, storage, lock) = service();
        let _held = lock.acquire().await.unwrap();

        let result = svc.award(AwardRequest::new("P", 5, "dice")).await;
        assert_eq!(result.failure.unwrap().code, "BP-AWARD-003");
        assert!(storage
            .get_source_row(&PlayerId::new("P"), AwardSource::DiceRoll)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_award_creates_then_increments_row() {
        let (svc, storage, _) = service();
        svc.award(AwardRequest::new("P", 5, "attendance")).await;
        let result = svc.award(AwardRequest::new("P", 7, "attendance")).await;

        assert!(result.success);
        assert_eq!(result.current_bp, 12);
        let row = storage
            .get_source_row(&PlayerId::new("P"), AwardSource::Attendance)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.points, 12);
    }

    #[tokio::test]
    async fn test_fuzzy_match_tagged() {
        let (svc, storage, _) = service();
        let result = svc.award(AwardRequest::new("alice", 5, "flag")).await;

        assert!(result.success);
        assert_eq!(result.player_id, Some(PlayerId::new("Alice-01")));
        assert!(result.tags.contains(&tags::FUZZY_MATCH.to_string()));

        let audit = storage.recent_audit(1).await.unwrap();
        assert_eq!(audit[0].band, Band::Amber);
    }

    #[tokio::test]
    async fn test_cap_and_overflow_tags() {
        let (svc, storage, _) = service();
        let result = svc
            .award(AwardRequest::new("P", 120, "dice").with_operator("staff"))
            .await;

        assert_eq!(result.tags, vec![tags::CAP.to_string(), tags::OVERFLOW.to_string()]);
        let audit = storage.recent_audit(1).await.unwrap();
        assert_eq!(audit[0].action, AuditAction::Award);
        assert_eq!(audit[0].operator, "staff");
        assert!(audit[0].tags.contains(tags::CAP));
    }

    #[tokio::test]
    async fn test_resync_is_zero_delta() {
        let (svc, storage, _) = service();
        svc.award(AwardRequest::new("P", 120, "dice")).await;

        let result = svc.resync("P", "ops").await;
        assert!(result.success);
        assert_eq!(result.historical_bp, 120);
        assert_eq!(result.prestige, 0);

        let prestige = storage.get_prestige(&PlayerId::new("P")).await.unwrap().unwrap();
        assert_eq!(prestige.total_overflow_cumulative, 20);
        assert_eq!(storage.recent_audit(1).await.unwrap()[0].action, AuditAction::Resync);
    }
}
