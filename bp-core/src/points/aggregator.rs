//! Aggregator
//!
//! Recomputes a player's raw total from their source ledger rows.

use crate::types::{AwardSource, BpTotalRow, SourceLedgerRow};
use chrono::Utc;
use std::collections::BTreeMap;

/// Per-source points and their sum
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregateResult {
    /// Every known source, absent rows contribute 0
    pub source_points: BTreeMap<AwardSource, u64>,
    pub raw_total: u64,
}

/// Aggregator
#[derive(Clone, Debug, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Sum the given rows. Rows are expected to belong to one player.
    pub fn aggregate(&self, rows: &[SourceLedgerRow]) -> AggregateResult {
        let mut source_points: BTreeMap<AwardSource, u64> =
            AwardSource::all().into_iter().map(|s| (s, 0)).collect();

        for row in rows {
            let slot = source_points.entry(row.source).or_insert(0);
            *slot = slot.saturating_add(row.points);
        }

        let raw_total = source_points
            .values()
            .fold(0u64, |acc, p| acc.saturating_add(*p));

        AggregateResult {
            source_points,
            raw_total,
        }
    }

    /// Write the per-source cache and raw total into the totals row
    pub fn apply(&self, row: &mut BpTotalRow, result: &AggregateResult) {
        row.source_points = result.source_points.clone();
        row.raw_total = result.raw_total;
        row.last_updated = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlayerId;

    fn row(source: AwardSource, points: u64) -> SourceLedgerRow {
        SourceLedgerRow::new(PlayerId::new("p1"), source, points)
    }

    #[test]
    fn test_absent_sources_contribute_zero() {
        let result = Aggregator::new().aggregate(&[row(AwardSource::DiceRoll, 120)]);
        assert_eq!(result.raw_total, 120);
        assert_eq!(result.source_points[&AwardSource::Attendance], 0);
        assert_eq!(result.source_points[&AwardSource::FlagMission], 0);
        assert_eq!(result.source_points.len(), 3);
    }

    #[test]
    fn test_sums_all_sources() {
        let result = Aggregator::new().aggregate(&[
            row(AwardSource::Attendance, 5),
            row(AwardSource::FlagMission, 7),
            row(AwardSource::DiceRoll, 11),
        ]);
        assert_eq!(result.raw_total, 23);
    }

    #[test]
    fn test_no_rows() {
        let result = Aggregator::new().aggregate(&[]);
        assert_eq!(result.raw_total, 0);
    }

    #[test]
    fn test_apply_updates_cache_only() {
        let mut total = BpTotalRow::new(PlayerId::new("p1"));
        total.historical_bp = 500;
        let result = Aggregator::new().aggregate(&[row(AwardSource::Attendance, 9)]);
        Aggregator::new().apply(&mut total, &result);

        assert_eq!(total.raw_total, 9);
        assert_eq!(total.points_for(AwardSource::Attendance), 9);
        assert_eq!(total.historical_bp, 500);
    }
}
