//! Prestige Converter
//!
//! Not idempotent: every call adds to the cumulative overflow. Each
//! conversion also records the watermark it covers, which is what the
//! governor measures the next owed amount against.

use crate::types::PrestigeRecord;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::DEFAULT_PRESTIGE_RATIO;

/// Outcome of one conversion
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrestigeConversion {
    pub overflow_added: u64,
    pub total_overflow_cumulative: u64,
    pub prestige_before: u64,
    pub prestige_after: u64,
}

impl PrestigeConversion {
    pub fn leveled_up(&self) -> bool {
        self.prestige_after > self.prestige_before
    }
}

/// Prestige converter
#[derive(Clone, Debug)]
pub struct PrestigeConverter {
    ratio: u64,
}

impl PrestigeConverter {
    /// `ratio` must be positive; zero is clamped to 1
    pub fn new(ratio: u64) -> Self {
        Self { ratio: ratio.max(1) }
    }

    pub fn ratio(&self) -> u64 {
        self.ratio
    }

    pub fn prestige_for(&self, total_overflow_cumulative: u64) -> u64 {
        total_overflow_cumulative / self.ratio
    }

    /// Add overflow produced up to `through_bp` and recompute prestige
    pub fn convert(
        &self,
        record: &mut PrestigeRecord,
        overflow: u64,
        through_bp: u64,
    ) -> PrestigeConversion {
        let prestige_before = record.prestige;
        record.total_overflow_cumulative = record.total_overflow_cumulative.saturating_add(overflow);
        record.converted_through_bp = record.converted_through_bp.max(through_bp);
        record.prestige = self.prestige_for(record.total_overflow_cumulative);
        record.last_updated = Utc::now();

        PrestigeConversion {
            overflow_added: overflow,
            total_overflow_cumulative: record.total_overflow_cumulative,
            prestige_before,
            prestige_after: record.prestige,
        }
    }
}

impl Default for PrestigeConverter {
    fn default() -> Self {
        Self::new(DEFAULT_PRESTIGE_RATIO)
    }
}
