//! Bonus Points Core
//!
//! Pure domain model for the player bonus-points ledger:
//! - **Award pipeline math**: [`Aggregator`] -> [`Governor`] -> [`PrestigeConverter`]
//! - **Spend protocol**: batch ids and the preview/commit decision
//! - **Canonical hashing**: stable digests over allocation plans
//! - **Store credit**: derived-balance transaction log
//!
//! # Ledger Invariants
//!
//! | Invariant | Requirement |
//! |-----------|-------------|
//! | **Watermark** | `historical_bp` never decreases |
//! | **Cap** | `current_bp` stays within `[0, cap]` |
//! | **Balance identity** | `overflow + current + redeemed == historical` |
//! | **Prestige** | `prestige == cumulative_overflow / ratio` |
//! | **Fixed totals** | spent totals never change; `reverted` only goes false -> true |
//! | **Preview expiry** | a preview commits only while `now < expires_at` |
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ bp-cli      operator commands                │
//! ├──────────────────────────────────────────────┤
//! │ bp-engine   locking, orchestration, audit    │
//! ├──────────────────────────────────────────────┤
//! │ bp-store    memory / sled backends           │
//! ├──────────────────────────────────────────────┤
//! │ bp-core     types, math, hashing (this crate)│
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this crate performs I/O.

pub mod canon;
pub mod config;
pub mod error;
pub mod logging;
pub mod points;
pub mod spend;
pub mod types;

mod invariants_tests;

pub use canon::{CanonSpec, Canonicalizer, HashAlgorithm};
pub use config::BpConfig;
pub use error::{BpError, BpResult, PipelineStage};
pub use logging::{LogLevel, AUDIT_DIAGNOSTICS_TARGET};
pub use points::{
    AggregateResult, Aggregator, Governor, GovernorOutcome, GovernorPolicy, PrestigeConversion,
    PrestigeConverter,
};
pub use spend::{decide_commit, new_batch_id, BatchIdGenerator, CommitDecision};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_scenario_math_end_to_end() {
        let governor = Governor::default();
        let converter = PrestigeConverter::default();
        let mut prestige = PrestigeRecord::new(PlayerId::new("P"));

        let a = governor.evaluate(120, 0, 0);
        let owed = governor.unconverted_overflow(&a, prestige.converted_through_bp);
        converter.convert(&mut prestige, owed, a.historical_bp);
        assert_eq!((a.historical_bp, a.current_bp, a.overflow), (120, 100, 20));
        assert_eq!(prestige.prestige, 0);

        let b = governor.evaluate(210, a.historical_bp, 0);
        let owed = governor.unconverted_overflow(&b, prestige.converted_through_bp);
        converter.convert(&mut prestige, owed, b.historical_bp);
        assert_eq!((b.historical_bp, b.current_bp), (210, 100));
        assert_eq!(prestige.total_overflow_cumulative, 110);
        assert_eq!(prestige.prestige, 1);
    }
}
