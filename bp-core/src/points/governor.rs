//! Governor
//!
//! Enforces the balance cap and the historical watermark.
//!
//! ```text
//! historical' = max(historical, raw_total)
//! uncapped    = historical' - total_redeemed
//! uncapped > cap  => current = cap,            overflow = uncapped - cap
//! otherwise       => current = max(0, uncapped), overflow = 0
//! ```
//!
//! Overflow still owed to the prestige converter is measured against the
//! watermark the converter last reached, not the previous watermark, so a
//! failed conversion is picked up again by the next run.

use crate::types::BpTotalRow;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::DEFAULT_CAP;

/// Governor policy
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorPolicy {
    /// Maximum spendable balance
    pub cap: u64,
}

impl Default for GovernorPolicy {
    fn default() -> Self {
        Self { cap: DEFAULT_CAP }
    }
}

/// Result of one governor evaluation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorOutcome {
    pub raw_total: u64,
    pub previous_historical_bp: u64,
    pub historical_bp: u64,
    pub total_redeemed: u64,
    pub current_bp: u64,
    /// Amount by which the uncapped balance exceeds the cap
    pub overflow: u64,
    /// Balance was clamped at the cap
    pub capped: bool,
}

impl GovernorOutcome {
    /// `overflow + current + redeemed == historical`, or the floor case where
    /// redemptions exceed the watermark and both overflow and current are 0
    pub fn balance_identity_holds(&self) -> bool {
        let lhs = self.overflow as u128 + self.current_bp as u128 + self.total_redeemed as u128;
        if self.total_redeemed > self.historical_bp {
            return self.current_bp == 0 && self.overflow == 0;
        }
        lhs == self.historical_bp as u128
    }
}

/// Governor
#[derive(Clone, Debug, Default)]
pub struct Governor {
    policy: GovernorPolicy,
}

impl Governor {
    pub fn new(policy: GovernorPolicy) -> Self {
        Self { policy }
    }

    pub fn with_cap(cap: u64) -> Self {
        Self::new(GovernorPolicy { cap })
    }

    pub fn cap(&self) -> u64 {
        self.policy.cap
    }

    /// Evaluate without mutating anything
    pub fn evaluate(
        &self,
        raw_total: u64,
        previous_historical_bp: u64,
        total_redeemed: u64,
    ) -> GovernorOutcome {
        let historical_bp = previous_historical_bp.max(raw_total);
        let (current_bp, overflow) = self.split(historical_bp, total_redeemed);

        GovernorOutcome {
            raw_total,
            previous_historical_bp,
            historical_bp,
            total_redeemed,
            current_bp,
            overflow,
            capped: historical_bp.saturating_sub(total_redeemed) > self.policy.cap,
        }
    }

    /// Overflow not yet handed to the converter.
    ///
    /// `converted_through_bp` is the watermark of the last successful
    /// conversion. Both sides are measured at the current redemption total.
    pub fn unconverted_overflow(&self, outcome: &GovernorOutcome, converted_through_bp: u64) -> u64 {
        let through = converted_through_bp.min(outcome.historical_bp);
        let (_, converted) = self.split(through, outcome.total_redeemed);
        outcome.overflow.saturating_sub(converted)
    }

    /// Persisted fields: watermark, current balance, raw total
    pub fn apply(&self, row: &mut BpTotalRow, outcome: &GovernorOutcome) {
        row.historical_bp = outcome.historical_bp;
        row.current_bp = outcome.current_bp;
        row.raw_total = outcome.raw_total;
        row.last_updated = Utc::now();
    }

    /// (current, overflow) for a watermark and redemption total
    fn split(&self, historical_bp: u64, total_redeemed: u64) -> (u64, u64) {
        let uncapped = historical_bp.saturating_sub(total_redeemed);
        if uncapped > self.policy.cap {
            (self.policy.cap, uncapped - self.policy.cap)
        } else {
            (uncapped, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_cap() {
        let out = Governor::default().evaluate(40, 0, 0);
        assert_eq!(out.historical_bp, 40);
        assert_eq!(out.current_bp, 40);
        assert_eq!(out.overflow, 0);
        assert!(!out.capped);
        assert!(out.balance_identity_holds());
    }

    #[test]
    fn test_first_award_over_cap() {
        let out = Governor::default().evaluate(120, 0, 0);
        assert_eq!(out.historical_bp, 120);
        assert_eq!(out.current_bp, 100);
        assert_eq!(out.overflow, 20);
        assert_eq!(Governor::default().unconverted_overflow(&out, 0), 20);
        assert!(out.capped);
        assert!(out.balance_identity_holds());
    }

    #[test]
    fn test_second_award_converts_only_new_overflow() {
        let gov = Governor::default();
        let out = gov.evaluate(210, 120, 0);
        assert_eq!(out.historical_bp, 210);
        assert_eq!(out.current_bp, 100);
        assert_eq!(out.overflow, 110);
        assert_eq!(gov.unconverted_overflow(&out, 120), 90);
    }

    #[test]
    fn test_failed_conversion_still_owed() {
        let gov = Governor::default();
        // Watermark already at 250 but the converter stopped at 0
        let out = gov.evaluate(250, 250, 0);
        assert_eq!(gov.unconverted_overflow(&out, 0), 150);
        assert_eq!(gov.unconverted_overflow(&out, 250), 0);
    }

    #[test]
    fn test_watermark_never_decreases() {
        let out = Governor::default().evaluate(50, 80, 0);
        assert_eq!(out.historical_bp, 80);
        assert_eq!(out.current_bp, 80);
        assert_eq!(Governor::default().unconverted_overflow(&out, 80), 0);
    }

    #[test]
    fn test_redemption_reduces_current() {
        let out = Governor::default().evaluate(90, 90, 30);
        assert_eq!(out.current_bp, 60);
        assert_eq!(out.overflow, 0);
        assert!(out.balance_identity_holds());
    }

    #[test]
    fn test_redemption_above_watermark_floors_at_zero() {
        let out = Governor::default().evaluate(10, 10, 25);
        assert_eq!(out.current_bp, 0);
        assert_eq!(out.overflow, 0);
        assert!(out.balance_identity_holds());
    }

    #[test]
    fn test_redemption_between_awards_does_not_create_overflow() {
        // 210 watermark, 50 redeemed: overflow 60 existed before this award
        let gov = Governor::default();
        let out = gov.evaluate(220, 210, 50);
        assert_eq!(out.overflow, 70);
        assert_eq!(gov.unconverted_overflow(&out, 210), 10);
    }

    #[test]
    fn test_custom_cap() {
        let out = Governor::with_cap(10).evaluate(15, 0, 0);
        assert_eq!(out.current_bp, 10);
        assert_eq!(out.overflow, 5);
    }

    #[test]
    fn test_apply_persists_fields() {
        let gov = Governor::default();
        let out = gov.evaluate(120, 0, 0);
        let mut row = BpTotalRow::new(crate::types::PlayerId::new("p1"));
        gov.apply(&mut row, &out);
        assert_eq!(row.historical_bp, 120);
        assert_eq!(row.current_bp, 100);
        assert_eq!(row.raw_total, 120);
    }
}
