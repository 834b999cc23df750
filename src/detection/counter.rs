// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-key access counting.
//!
//! [`DecayingCounter`] keeps one record per key whose deadline is pushed to
//! `now + window` on every access. A steady trickle of hits therefore keeps a
//! record alive indefinitely: the count means "accesses since the key last went
//! quiet for a full window", not "accesses in the last window". Callers that
//! need a true sliding window can supply their own [`AccessWindow`].

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::{deadline_after, Clock};

/// Frequency tracker consulted by the hot-key detector.
pub trait AccessWindow: Send + Sync {
    /// Record one access and return the post-increment count.
    fn record(&self, key: &str) -> u64;

    /// Current count for `key`, 0 if untracked or expired.
    fn count(&self, key: &str) -> u64;

    /// Drop state for `key`.
    fn forget(&self, key: &str);

    /// Remove expired state, returning how many keys were dropped.
    fn purge_expired(&self) -> usize;

    /// Number of keys currently holding state (live or not yet purged).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct AccessRecord {
    count: u64,
    window_deadline: Instant,
}

impl AccessRecord {
    #[inline]
    fn is_live(&self, now: Instant) -> bool {
        now < self.window_deadline
    }
}

/// Decaying-window access counter.
pub struct DecayingCounter {
    records: DashMap<String, AccessRecord>,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl DecayingCounter {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            window,
            clock,
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    fn bump(record: &mut AccessRecord, now: Instant, window: Duration) -> u64 {
        if !record.is_live(now) {
            record.count = 0;
        }
        record.count = record.count.saturating_add(1);
        record.window_deadline = deadline_after(now, window);
        record.count
    }
}

impl AccessWindow for DecayingCounter {
    fn record(&self, key: &str) -> u64 {
        let now = self.clock.now();

        // Fast path avoids allocating the key for already-tracked entries
        if let Some(mut record) = self.records.get_mut(key) {
            return Self::bump(&mut record, now, self.window);
        }

        let mut record = self.records.entry(key.to_string()).or_insert(AccessRecord {
            count: 0,
            window_deadline: now,
        });
        Self::bump(&mut record, now, self.window)
    }

    fn count(&self, key: &str) -> u64 {
        let now = self.clock.now();
        self.records
            .get(key)
            .filter(|record| record.is_live(now))
            .map_or(0, |record| record.count)
    }

    fn forget(&self, key: &str) {
        self.records.remove(key);
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.records.len();
        self.records.retain(|_, record| record.is_live(now));
        before.saturating_sub(self.records.len())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn counter(window_secs: u64) -> (DecayingCounter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let counter = DecayingCounter::new(Duration::from_secs(window_secs), clock.clone());
        (counter, clock)
    }

    #[test]
    fn test_first_access_counts_one() {
        let (counter, _) = counter(10);
        assert_eq!(counter.record("k"), 1);
        assert_eq!(counter.count("k"), 1);
    }

    #[test]
    fn test_huge_window_does_not_overflow() {
        let clock = Arc::new(ManualClock::new());
        let counter = DecayingCounter::new(Duration::from_millis(u64::MAX), clock.clone());
        assert_eq!(counter.record("k"), 1);
        clock.advance(Duration::from_secs(3600));
        assert_eq!(counter.record("k"), 2);
    }

    #[test]
    fn test_accesses_accumulate_within_window() {
        let (counter, clock) = counter(10);
        for expected in 1..=5 {
            assert_eq!(counter.record("k"), expected);
            clock.advance(Duration::from_secs(1));
        }
        assert_eq!(counter.count("k"), 5);
    }

    #[test]
    fn test_count_resets_after_quiet_window() {
        let (counter, clock) = counter(10);
        counter.record("k");
        counter.record("k");

        clock.advance(Duration::from_secs(10));
        assert_eq!(counter.count("k"), 0);
        assert_eq!(counter.record("k"), 1);
    }

    #[test]
    fn test_each_hit_extends_window() {
        let (counter, clock) = counter(10);

        // 30 hits spread over ~4 minutes, never 10 s apart: the count never decays
        for _ in 0..30 {
            counter.record("k");
            clock.advance(Duration::from_secs(8));
        }
        assert_eq!(counter.count("k"), 30);
    }

    #[test]
    fn test_keys_are_independent() {
        let (counter, _) = counter(10);
        counter.record("a");
        counter.record("a");
        counter.record("b");

        assert_eq!(counter.count("a"), 2);
        assert_eq!(counter.count("b"), 1);
        assert_eq!(counter.count("c"), 0);
    }

    #[test]
    fn test_forget_drops_record() {
        let (counter, _) = counter(10);
        counter.record("k");
        counter.forget("k");
        assert_eq!(counter.count("k"), 0);
        assert!(counter.is_empty());
    }

    #[test]
    fn test_purge_expired_only_removes_dead_records() {
        let (counter, clock) = counter(10);
        counter.record("old");
        clock.advance(Duration::from_secs(6));
        counter.record("fresh");
        clock.advance(Duration::from_secs(5));

        assert_eq!(counter.purge_expired(), 1);
        assert_eq!(counter.len(), 1);
        assert_eq!(counter.count("fresh"), 1);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let (counter, _) = counter(60);
        let counter = Arc::new(counter);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        counter.record("shared");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.count("shared"), 4000);
    }
}
