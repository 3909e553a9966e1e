//! Ledger Row Types
//!
//! Typed schema for every persisted balance row. Storage backends serialize
//! these structs directly; there is no header-name column discovery.

use super::common::{AwardSource, PlayerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row per player per award source
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLedgerRow {
    pub player_id: PlayerId,
    pub source: AwardSource,
    /// Non-negative point total for this source
    pub points: u64,
    pub last_updated: DateTime<Utc>,
}

impl SourceLedgerRow {
    /// Create a row holding the first award
    pub fn new(player_id: PlayerId, source: AwardSource, points: u64) -> Self {
        Self {
            player_id,
            source,
            points,
            last_updated: Utc::now(),
        }
    }

    /// Apply an award delta
    pub fn add(&mut self, delta: u64) {
        self.points = self.points.saturating_add(delta);
        self.last_updated = Utc::now();
    }
}

/// Derived aggregate row for a player
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BpTotalRow {
    pub player_id: PlayerId,
    /// Per-source cache written by the aggregator
    pub source_points: BTreeMap<AwardSource, u64>,
    /// Sum across sources
    pub raw_total: u64,
    /// Post-cap, post-redemption balance
    pub current_bp: u64,
    /// Highest raw total ever observed; never decreases
    pub historical_bp: u64,
    pub last_updated: DateTime<Utc>,
}

impl BpTotalRow {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            source_points: BTreeMap::new(),
            raw_total: 0,
            current_bp: 0,
            historical_bp: 0,
            last_updated: Utc::now(),
        }
    }

    /// Cached points for one source (absent = 0)
    pub fn points_for(&self, source: AwardSource) -> u64 {
        self.source_points.get(&source).copied().unwrap_or(0)
    }
}

/// Redemption totals, written by the external redemption service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRecord {
    pub player_id: PlayerId,
    /// Monotonic non-decreasing
    pub total_redeemed: u64,
    pub last_updated: DateTime<Utc>,
}

impl RedemptionRecord {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            total_redeemed: 0,
            last_updated: Utc::now(),
        }
    }
}

/// Secondary counter accrued from cumulative overflow
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrestigeRecord {
    pub player_id: PlayerId,
    pub prestige: u64,
    /// Monotonic non-decreasing
    pub total_overflow_cumulative: u64,
    /// Historical watermark up to which overflow has been converted
    pub converted_through_bp: u64,
    pub last_updated: DateTime<Utc>,
}

impl PrestigeRecord {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            prestige: 0,
            total_overflow_cumulative: 0,
            converted_through_bp: 0,
            last_updated: Utc::now(),
        }
    }
}
