//! Request-path and operational API.
//!
//! - `read()` / `write()` / `delete()` - the cascade proper
//! - `stats()` / `list_hot()` / `snapshot()` - introspection
//! - `clear_hot()` / `set_rate()` / `clear_rate()` - manual controls

use tracing::{debug, warn};

use crate::admission::Admission;
use crate::config::RateLimitConfig;
use crate::metrics::{self, LatencyTimer};

use super::{validate_key, CascadeError, CascadeStats, HotKeyCascade, KeyStats, ReadOutcome, ReadSource};

impl HotKeyCascade {
    // ═══════════════════════════════════════════════════════════════════════════
    // Request path
    // ═══════════════════════════════════════════════════════════════════════════

    /// Read `key` through the cascade.
    ///
    /// Cold keys always go to the backing store and are never cached. Hot keys
    /// are served from the fallback cache when possible; on a miss they need a
    /// token before the store is contacted.
    #[tracing::instrument(skip(self), fields(hot))]
    pub async fn read(&self, key: &str) -> Result<ReadOutcome, CascadeError> {
        validate_key(key)?;
        let _timer = LatencyTimer::new("read");

        let is_hot = self.detector.record_and_check(key);
        tracing::Span::current().record("hot", is_hot);

        if is_hot {
            if let Some(value) = self.fallback.lookup(key) {
                debug!("Hot key cache hit");
                let outcome = ReadOutcome::Value { value, source: ReadSource::Cache };
                metrics::record_operation("read", outcome.label());
                return Ok(outcome);
            }

            if let Admission::Denied { retry_after } = self.admission.check(key) {
                debug!(?retry_after, "Rate limited for hot key");
                let outcome = ReadOutcome::Throttled { retry_after };
                metrics::record_operation("read", outcome.label());
                return Ok(outcome);
            }
        }

        let fetched = match self.store.get(key).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(error = %e, "Backing store read failed");
                metrics::record_store_error("read");
                metrics::record_operation("read", "error");
                return Err(CascadeError::StoreUnavailable(e));
            }
        };

        let outcome = match fetched {
            Some(value) => {
                if is_hot {
                    self.fallback.populate(key, value.clone(), self.config.fallback_ttl());
                }
                ReadOutcome::Value { value, source: ReadSource::Store }
            }
            None => ReadOutcome::NotFound,
        };

        metrics::record_operation("read", outcome.label());
        Ok(outcome)
    }

    /// Write `value` to the backing store.
    ///
    /// If `key` is hot the fallback entry is refreshed with the new value.
    /// Cold keys are written to the store only.
    #[tracing::instrument(skip(self, value), fields(len = value.len()))]
    pub async fn write(&self, key: &str, value: Vec<u8>) -> Result<(), CascadeError> {
        validate_key(key)?;
        if value.is_empty() {
            return Err(CascadeError::EmptyValue);
        }
        let _timer = LatencyTimer::new("write");

        if let Err(e) = self.store.set(key, &value, self.config.store_ttl()).await {
            warn!(error = %e, "Backing store write failed");
            metrics::record_store_error("write");
            metrics::record_operation("write", "error");
            return Err(CascadeError::StoreUnavailable(e));
        }

        if self.detector.is_hot(key) {
            self.fallback.populate(key, value, self.config.fallback_ttl());
            debug!("Hot key cache updated");
        }

        metrics::record_operation("write", "store");
        Ok(())
    }

    /// Delete `key` from the backing store and drop any fallback copy.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<(), CascadeError> {
        validate_key(key)?;
        let _timer = LatencyTimer::new("delete");

        if let Err(e) = self.store.delete(key).await {
            warn!(error = %e, "Backing store delete failed");
            metrics::record_store_error("delete");
            metrics::record_operation("delete", "error");
            return Err(CascadeError::StoreUnavailable(e));
        }

        self.fallback.invalidate(key);
        metrics::record_operation("delete", "store");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Introspection
    // ═══════════════════════════════════════════════════════════════════════════

    /// Detection and caching state for `key`. Does not count as an access.
    pub fn stats(&self, key: &str) -> Result<KeyStats, CascadeError> {
        validate_key(key)?;
        Ok(KeyStats {
            key: key.to_string(),
            access_count: self.detector.access_count(key),
            is_hot: self.detector.is_hot(key),
            in_fallback_cache: self.fallback.contains(key),
        })
    }

    /// Every key with a live hot flag, sorted.
    #[must_use]
    pub fn list_hot(&self) -> Vec<String> {
        self.detector.hot_keys()
    }

    /// Aggregate counters across components.
    #[must_use]
    pub fn snapshot(&self) -> CascadeStats {
        CascadeStats {
            hot_keys: self.detector.hot_keys().len(),
            tracked_keys: self.detector.tracked_keys(),
            fallback: self.fallback.stats(),
            admission: self.admission.stats(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Manual controls
    // ═══════════════════════════════════════════════════════════════════════════

    /// Unmark `key` as hot. Returns `true` if a live flag was removed.
    ///
    /// The fallback entry is left to expire on its own; a cold key is never
    /// looked up there, so it cannot be served.
    pub fn clear_hot(&self, key: &str) -> Result<bool, CascadeError> {
        validate_key(key)?;
        Ok(self.detector.clear(key))
    }

    /// Give `key` a custom token bucket. Negative or non-finite rates are rejected.
    pub fn set_rate(&self, key: &str, rate_per_second: f64, burst: u32) -> Result<(), CascadeError> {
        validate_key(key)?;
        let limit = RateLimitConfig::new(rate_per_second, burst);
        limit.validate()?;
        self.admission.set_rate(key, limit);
        Ok(())
    }

    /// Return `key` to the default bucket. Returns `true` if it had an override.
    pub fn clear_rate(&self, key: &str) -> Result<bool, CascadeError> {
        validate_key(key)?;
        Ok(self.admission.clear_rate(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::CascadeConfig;
    use crate::storage::memory::InMemoryStore;
    use crate::storage::traits::BackingStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn cascade(threshold: u64) -> (HotKeyCascade, Arc<InMemoryStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let config = CascadeConfig {
            threshold,
            ..Default::default()
        };
        let cascade = HotKeyCascade::with_clock(config, store.clone(), clock.clone());
        (cascade, store, clock)
    }

    #[tokio::test]
    async fn test_cold_read_goes_to_store() {
        let (cascade, store, _) = cascade(100);
        store.set("k", b"v", None).await.unwrap();

        let outcome = cascade.read("k").await.unwrap();
        assert_eq!(outcome.source(), Some(ReadSource::Store));
        assert!(!cascade.fallback().contains("k"));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let (cascade, _, _) = cascade(100);
        assert_eq!(cascade.read("nope").await.unwrap(), ReadOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_invalid_key_touches_nothing() {
        let (cascade, _, _) = cascade(1);
        assert!(matches!(cascade.read("").await, Err(CascadeError::InvalidKey(_))));
        assert!(matches!(cascade.write("", b"v".to_vec()).await, Err(CascadeError::InvalidKey(_))));
        assert_eq!(cascade.detector().tracked_keys(), 0);
        assert!(cascade.list_hot().is_empty());
    }

    #[tokio::test]
    async fn test_empty_value_rejected() {
        let (cascade, store, _) = cascade(100);
        assert!(matches!(cascade.write("k", Vec::new()).await, Err(CascadeError::EmptyValue)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_hot_read_populates_then_hits_cache() {
        let (cascade, store, _) = cascade(2);
        store.set("k", b"v", None).await.unwrap();

        assert_eq!(cascade.read("k").await.unwrap().source(), Some(ReadSource::Store));
        // Second access crosses the threshold: served by the store, then cached
        assert_eq!(cascade.read("k").await.unwrap().source(), Some(ReadSource::Store));
        assert!(cascade.fallback().contains("k"));
        assert_eq!(cascade.read("k").await.unwrap().source(), Some(ReadSource::Cache));
    }

    #[tokio::test]
    async fn test_write_refreshes_cache_only_for_hot_keys() {
        let (cascade, _, _) = cascade(1);

        cascade.write("cold", b"v1".to_vec()).await.unwrap();
        assert!(!cascade.fallback().contains("cold"));

        cascade.read("hot").await.unwrap(); // threshold 1: hot immediately
        cascade.write("hot", b"v2".to_vec()).await.unwrap();
        assert_eq!(cascade.fallback().lookup("hot"), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn test_delete_invalidates_fallback() {
        let (cascade, store, _) = cascade(1);
        store.set("k", b"v", None).await.unwrap();
        cascade.read("k").await.unwrap();
        assert!(cascade.fallback().contains("k"));

        cascade.delete("k").await.unwrap();
        assert!(!cascade.fallback().contains("k"));
        assert_eq!(cascade.read("k").await.unwrap(), ReadOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_write_uses_store_ttl() {
        let (cascade, store, clock) = cascade(100);
        cascade.write("k", b"v".to_vec()).await.unwrap();

        clock.advance(Duration::from_secs(3600));
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_hot_and_rate_controls() {
        let (cascade, _, _) = cascade(1);
        cascade.read("k").await.unwrap();
        assert_eq!(cascade.list_hot(), vec!["k".to_string()]);

        assert!(cascade.clear_hot("k").unwrap());
        assert!(cascade.list_hot().is_empty());

        cascade.set_rate("k", 1.0, 1).unwrap();
        assert_eq!(cascade.admission().limit_for("k"), RateLimitConfig::new(1.0, 1));
        assert!(cascade.clear_rate("k").unwrap());
    }

    #[tokio::test]
    async fn test_set_rate_rejects_non_finite_and_negative() {
        let (cascade, _, _) = cascade(1);
        for rate in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -1.0] {
            assert!(matches!(cascade.set_rate("k", rate, 5), Err(CascadeError::InvalidRate(_))));
        }
        assert_eq!(cascade.admission().limit_for("k"), RateLimitConfig::default());
    }

    #[tokio::test]
    async fn test_vanishing_rate_throttles_without_retry_hint() {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let config = CascadeConfig {
            threshold: 1,
            rate_limit: RateLimitConfig::new(1e-30, 1),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        let cascade = HotKeyCascade::with_clock(config, store, clock);

        assert_eq!(cascade.read("k").await.unwrap(), ReadOutcome::NotFound);
        assert_eq!(cascade.read("k").await.unwrap(), ReadOutcome::Throttled { retry_after: None });
    }

    #[tokio::test]
    async fn test_huge_ttls_do_not_overflow() {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let config = CascadeConfig {
            threshold: 1,
            window_ms: u64::MAX,
            hot_key_ttl_secs: u64::MAX,
            fallback_ttl_secs: u64::MAX,
            store_ttl_secs: u64::MAX,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        let cascade = HotKeyCascade::with_clock(config, store.clone(), clock.clone());

        cascade.write("k", b"v".to_vec()).await.unwrap();
        assert_eq!(cascade.read("k").await.unwrap().source(), Some(ReadSource::Store));
        assert_eq!(cascade.read("k").await.unwrap().source(), Some(ReadSource::Cache));

        clock.advance(Duration::from_secs(365 * 24 * 3600));
        assert!(cascade.stats("k").unwrap().is_hot);
        assert!(cascade.fallback().contains("k"));
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_snapshot_counts() {
        let (cascade, store, _) = cascade(1);
        store.set("k", b"v", None).await.unwrap();
        cascade.read("k").await.unwrap(); // miss, allowed, store
        cascade.read("k").await.unwrap(); // cache hit

        let snapshot = cascade.snapshot();
        assert_eq!(snapshot.hot_keys, 1);
        assert_eq!(snapshot.tracked_keys, 1);
        assert_eq!(snapshot.fallback.hits, 1);
        assert_eq!(snapshot.fallback.misses, 1);
        assert_eq!(snapshot.admission.allowed, 1);
    }
}
