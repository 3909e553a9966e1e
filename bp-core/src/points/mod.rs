//! Points Pipeline
//!
//! The three derivation stages run by every award, in order:
//! 1. [`Aggregator`]: source ledgers -> raw total
//! 2. [`Governor`]: raw total -> watermark, capped balance, overflow
//! 3. [`PrestigeConverter`]: newly produced overflow -> prestige
//!
//! All three are pure; persistence and locking live in the engine.

mod aggregator;
mod governor;
mod prestige;

pub use aggregator::{AggregateResult, Aggregator};
pub use governor::{Governor, GovernorOutcome, GovernorPolicy};
pub use prestige::{PrestigeConversion, PrestigeConverter};

/// Default balance cap
pub const DEFAULT_CAP: u64 = 100;

/// Default overflow points per prestige
pub const DEFAULT_PRESTIGE_RATIO: u64 = 100;
