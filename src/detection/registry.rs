//! The set of keys currently flagged hot.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::clock::Clock;

/// TTL-bounded hot flags, one per key.
///
/// A key is hot iff it has a flag whose expiry is still in the future. Expired
/// flags are treated as absent on read and dropped lazily or by
/// [`purge_expired`](Self::purge_expired).
pub struct HotKeyRegistry {
    flags: DashMap<String, Instant>,
    clock: Arc<dyn Clock>,
}

impl HotKeyRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            flags: DashMap::new(),
            clock,
        }
    }

    /// Flag `key` hot until `now + ttl`. Re-marking replaces the expiry.
    pub fn mark_hot(&self, key: &str, ttl: Duration) {
        let expires_at = self.clock.deadline(ttl);
        self.flags.insert(key.to_string(), expires_at);
    }

    #[must_use]
    pub fn is_hot(&self, key: &str) -> bool {
        let now = self.clock.now();
        match self.flags.get(key) {
            Some(expires_at) if now < *expires_at => true,
            Some(expires_at) => {
                drop(expires_at); // Release shard read lock before removing
                self.flags.remove_if(key, |_, expires_at| now >= *expires_at);
                false
            }
            None => false,
        }
    }

    /// Remove the flag for `key` regardless of expiry.
    ///
    /// Returns `true` if a live flag was removed.
    pub fn clear(&self, key: &str) -> bool {
        let now = self.clock.now();
        match self.flags.remove(key) {
            Some((_, expires_at)) => {
                info!(key, "Hot key mark removed");
                now < expires_at
            }
            None => false,
        }
    }

    /// All keys with a live flag, sorted.
    #[must_use]
    pub fn hot_keys(&self) -> Vec<String> {
        let now = self.clock.now();
        let mut keys: Vec<String> = self
            .flags
            .iter()
            .filter(|flag| now < *flag.value())
            .map(|flag| flag.key().clone())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Time left on `key`'s flag, `None` if it is not hot.
    #[must_use]
    pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        self.flags
            .get(key)
            .and_then(|expires_at| expires_at.checked_duration_since(now))
            .filter(|left| !left.is_zero())
    }

    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.flags.len();
        self.flags.retain(|_, expires_at| now < *expires_at);
        before.saturating_sub(self.flags.len())
    }

    /// Flags held, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn registry() -> (HotKeyRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (HotKeyRegistry::new(clock.clone()), clock)
    }

    #[test]
    fn test_unmarked_key_is_cold() {
        let (registry, _) = registry();
        assert!(!registry.is_hot("k"));
    }

    #[test]
    fn test_mark_then_expire() {
        let (registry, clock) = registry();
        registry.mark_hot("k", Duration::from_secs(300));

        clock.advance(Duration::from_secs(299));
        assert!(registry.is_hot("k"));

        clock.advance(Duration::from_secs(1));
        assert!(!registry.is_hot("k"));
        assert!(registry.is_empty(), "expired flag dropped on read");
    }

    #[test]
    fn test_huge_ttl_stays_hot() {
        let (registry, clock) = registry();
        registry.mark_hot("k", Duration::from_secs(u64::MAX));

        clock.advance(Duration::from_secs(365 * 24 * 3600));
        assert!(registry.is_hot("k"));
    }

    #[test]
    fn test_remark_extends_not_stacks() {
        let (registry, clock) = registry();
        registry.mark_hot("k", Duration::from_secs(60));
        clock.advance(Duration::from_secs(50));
        registry.mark_hot("k", Duration::from_secs(60));

        assert_eq!(registry.remaining_ttl("k"), Some(Duration::from_secs(60)));
        assert_eq!(registry.len(), 1);

        clock.advance(Duration::from_secs(59));
        assert!(registry.is_hot("k"));
        clock.advance(Duration::from_secs(1));
        assert!(!registry.is_hot("k"));
    }

    #[test]
    fn test_clear_removes_live_flag() {
        let (registry, _) = registry();
        registry.mark_hot("k", Duration::from_secs(60));

        assert!(registry.clear("k"));
        assert!(!registry.is_hot("k"));
        assert!(!registry.clear("k"));
    }

    #[test]
    fn test_clear_expired_flag_reports_false() {
        let (registry, clock) = registry();
        registry.mark_hot("k", Duration::from_secs(1));
        clock.advance(Duration::from_secs(2));
        assert!(!registry.clear("k"));
    }

    #[test]
    fn test_hot_keys_lists_only_live_flags() {
        let (registry, clock) = registry();
        registry.mark_hot("b", Duration::from_secs(100));
        registry.mark_hot("a", Duration::from_secs(100));
        registry.mark_hot("short", Duration::from_secs(5));
        clock.advance(Duration::from_secs(10));

        assert_eq!(registry.hot_keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_purge_expired() {
        let (registry, clock) = registry();
        registry.mark_hot("short", Duration::from_secs(5));
        registry.mark_hot("long", Duration::from_secs(500));
        clock.advance(Duration::from_secs(6));

        assert_eq!(registry.purge_expired(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_hot("long"));
    }

    #[test]
    fn test_remaining_ttl_none_when_cold() {
        let (registry, _) = registry();
        assert_eq!(registry.remaining_ttl("k"), None);
    }
}
