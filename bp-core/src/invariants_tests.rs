//! Ledger Invariant Coverage
//!
//! Every ledger invariant gets at least one test here, driven through the
//! pure pipeline stages rather than storage.
//!
//! 1. Historical watermark never decreases
//! 2. Current balance stays within [0, cap]
//! 3. overflow + current + redeemed == historical (0 floor on inconsistent input)
//! 4. prestige == floor(cumulative overflow / ratio) after each governor run
//! 5. Spent entry totals are fixed at write; reverted only goes false -> true
//! 6. A preview is usable for commit only while now < expires_at

#[cfg(test)]
mod tests {
    use crate::points::{Aggregator, Governor, PrestigeConverter};
    use crate::spend::{decide_commit, CommitDecision};
    use crate::types::{
        AbortReason, AwardSource, BatchId, BpTotalRow, Digest, EventId, PlayerId, PreviewArtifact,
        PrestigeRecord, SourceLedgerRow, SpendLineItem, SpentPoolEntry,
    };
    use chrono::{Duration, Utc};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Replays one award through aggregator, governor and converter
    struct Harness {
        rows: Vec<SourceLedgerRow>,
        total: BpTotalRow,
        prestige: PrestigeRecord,
        redeemed: u64,
        governor: Governor,
        converter: PrestigeConverter,
    }

    impl Harness {
        fn new() -> Self {
            let player = PlayerId::new("p1");
            Self {
                rows: Vec::new(),
                total: BpTotalRow::new(player.clone()),
                prestige: PrestigeRecord::new(player),
                redeemed: 0,
                governor: Governor::default(),
                converter: PrestigeConverter::default(),
            }
        }

        fn award(&mut self, source: AwardSource, delta: u64) -> crate::points::GovernorOutcome {
            match self.rows.iter().position(|r| r.source == source) {
                Some(i) => self.rows[i].add(delta),
                None => {
                    let player = self.total.player_id.clone();
                    self.rows.push(SourceLedgerRow::new(player, source, delta));
                }
            }
            let agg = Aggregator::new().aggregate(&self.rows);
            Aggregator::new().apply(&mut self.total, &agg);

            let outcome =
                self.governor
                    .evaluate(agg.raw_total, self.total.historical_bp, self.redeemed);
            self.governor.apply(&mut self.total, &outcome);
            let owed = self
                .governor
                .unconverted_overflow(&outcome, self.prestige.converted_through_bp);
            if owed > 0 {
                self.converter
                    .convert(&mut self.prestige, owed, outcome.historical_bp);
            }
            outcome
        }
    }

    fn random_source(rng: &mut StdRng) -> AwardSource {
        AwardSource::all()[rng.gen_range(0..3)]
    }

    // ========================================================================
    // INVARIANT 1: historical watermark never decreases
    // ========================================================================

    #[test]
    fn invariant_historical_non_decreasing() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut h = Harness::new();
        let mut last = 0;
        for _ in 0..200 {
            let source = random_source(&mut rng);
            h.award(source, rng.gen_range(1..60));
            if rng.gen_bool(0.2) {
                h.redeemed += rng.gen_range(0..40);
            }
            assert!(h.total.historical_bp >= last);
            last = h.total.historical_bp;
        }
    }

    #[test]
    fn invariant_historical_survives_lower_raw_total() {
        let out = Governor::default().evaluate(30, 250, 0);
        assert_eq!(out.historical_bp, 250);
    }

    // ========================================================================
    // INVARIANT 2: current within [0, cap]
    // ========================================================================

    #[test]
    fn invariant_current_within_cap() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut h = Harness::new();
        for _ in 0..200 {
            let out = h.award(random_source(&mut rng), rng.gen_range(1..150));
            if rng.gen_bool(0.3) {
                h.redeemed += rng.gen_range(0..200);
            }
            assert!(out.current_bp <= h.governor.cap());
            assert!(h.total.current_bp <= h.governor.cap());
        }
    }

    // ========================================================================
    // INVARIANT 3: balance identity
    // ========================================================================

    #[test]
    fn invariant_balance_identity_after_every_run() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut h = Harness::new();
        for _ in 0..200 {
            let out = h.award(random_source(&mut rng), rng.gen_range(1..80));
            if rng.gen_bool(0.25) {
                h.redeemed += rng.gen_range(0..50);
            }
            assert!(out.balance_identity_holds(), "{:?}", out);
        }
    }

    #[test]
    fn invariant_balance_identity_floor() {
        let out = Governor::default().evaluate(20, 20, 35);
        assert_eq!((out.current_bp, out.overflow), (0, 0));
        assert!(out.balance_identity_holds());
    }

    // ========================================================================
    // INVARIANT 4: prestige tracks cumulative overflow
    // ========================================================================

    #[test]
    fn invariant_prestige_is_floor_of_cumulative() {
        let mut rng = StdRng::seed_from_u64(17);
        let mut h = Harness::new();
        for _ in 0..200 {
            h.award(random_source(&mut rng), rng.gen_range(1..120));
            assert_eq!(
                h.prestige.prestige,
                h.prestige.total_overflow_cumulative / h.converter.ratio()
            );
        }
    }

    #[test]
    fn invariant_cumulative_overflow_matches_watermark_without_redemptions() {
        let mut h = Harness::new();
        h.award(AwardSource::DiceRoll, 120);
        h.award(AwardSource::Attendance, 90);
        h.award(AwardSource::FlagMission, 5);
        // Everything above the cap has been converted exactly once
        assert_eq!(
            h.prestige.total_overflow_cumulative,
            h.total.historical_bp - h.governor.cap()
        );
    }

    // ========================================================================
    // INVARIANT 5: spent totals immutable, reverted monotonic
    // ========================================================================

    #[test]
    fn invariant_spent_total_fixed_and_revert_monotonic() {
        let line = SpendLineItem::new("TICKET", 4, 25);
        let mut entry = SpentPoolEntry::from_line(
            &EventId::new("E1"),
            "prize_draw",
            &BatchId::new("B1"),
            &line,
            Utc::now(),
        )
        .unwrap();
        let total = entry.total;

        assert!(entry.mark_reverted());
        assert!(!entry.mark_reverted());
        assert!(entry.reverted);
        assert_eq!(entry.total, total);
    }

    // ========================================================================
    // INVARIANT 6: preview usable only before expiry
    // ========================================================================

    #[test]
    fn invariant_preview_expiry_boundary() {
        let hash = Digest::sha256(b"plan");
        let created = Utc::now();
        let artifact = PreviewArtifact::new(
            EventId::new("E1"),
            None,
            hash.clone(),
            created,
            Duration::seconds(60),
        );

        let just_before = artifact.expires_at - Duration::milliseconds(1);
        let at_expiry = artifact.expires_at;

        assert!(decide_commit(&[artifact.clone()], &hash, &just_before).is_proceed());
        assert_eq!(
            decide_commit(&[artifact], &hash, &at_expiry),
            CommitDecision::Abort {
                reason: AbortReason::PreviewExpired
            }
        );
    }
}
