//! Batch Id Generation
//!
//! Format: `B{millis:013}-{random:016x}`. The millisecond prefix is strictly
//! increasing within a generator, so ids sort in creation order; the random
//! suffix keeps ids from separate processes apart.

use crate::types::BatchId;
use chrono::Utc;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

pub const BATCH_ID_PREFIX: &str = "B";

static GLOBAL: BatchIdGenerator = BatchIdGenerator::new();

/// Generate a batch id from the process-wide generator
pub fn new_batch_id() -> BatchId {
    GLOBAL.generate()
}

/// Batch id generator, safe to share between threads
#[derive(Debug)]
pub struct BatchIdGenerator {
    last_millis: AtomicU64,
}

impl BatchIdGenerator {
    pub const fn new() -> Self {
        Self {
            last_millis: AtomicU64::new(0),
        }
    }

    pub fn generate(&self) -> BatchId {
        let millis = self.next_millis(Utc::now().timestamp_millis().max(0) as u64);
        let suffix: u64 = rand::thread_rng().gen();
        BatchId::new(format!("{}{:013}-{:016x}", BATCH_ID_PREFIX, millis, suffix))
    }

    /// Strictly increasing: a clock that stalls or steps back borrows the next millisecond
    fn next_millis(&self, now: u64) -> u64 {
        let mut last = self.last_millis.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_millis.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

impl Default for BatchIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_format() {
        let id = BatchIdGenerator::new().generate();
        let s = id.as_str();
        assert!(s.starts_with(BATCH_ID_PREFIX));
        let (prefix, suffix) = s[1..].split_once('-').unwrap();
        assert_eq!(prefix.len(), 13);
        assert_eq!(suffix.len(), 16);
    }

    #[test]
    fn test_sorted_by_creation() {
        let gen = BatchIdGenerator::new();
        let ids: Vec<BatchId> = (0..500).map(|_| gen.generate()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_clock_step_back() {
        let gen = BatchIdGenerator::new();
        assert_eq!(gen.next_millis(1_000), 1_000);
        assert_eq!(gen.next_millis(900), 1_001);
        assert_eq!(gen.next_millis(1_001), 1_002);
    }

    #[test]
    fn test_unique_across_threads() {
        let gen = Arc::new(BatchIdGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gen = gen.clone();
                std::thread::spawn(move || (0..200).map(|_| gen.generate()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 1600);
    }
}
