// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-key admission control for hot keys.
//!
//! Each key gets its own [`TokenBucket`], created full on its first check.
//! Per-key overrides (`set_rate`) are kept apart from bucket state, so an
//! eviction pass resets token debt but never forgets a configured limit.
//!
//! # Example
//!
//! ```
//! use hot_key_cascade::{AdmissionController, RateLimitConfig, SystemClock};
//! use hot_key_cascade::admission::eviction::BulkReset;
//! use std::sync::Arc;
//!
//! let limiter = AdmissionController::new(
//!     RateLimitConfig::new(1.0, 2),
//!     Box::new(BulkReset),
//!     Arc::new(SystemClock),
//! );
//!
//! assert!(limiter.allow("sku:42"));
//! assert!(limiter.allow("sku:42"));
//! assert!(!limiter.allow("sku:42")); // burst spent
//! ```

pub mod bucket;
pub mod eviction;

pub use bucket::TokenBucket;
pub use eviction::{BucketEviction, BulkReset, IdleEviction};

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::{CascadeConfig, RateLimitConfig};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// `retry_after` is `None` when the bucket can never refill
    Denied { retry_after: Option<Duration> },
}

impl Admission {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Admission counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionStats {
    pub allowed: u64,
    pub denied: u64,
    /// Live buckets
    pub buckets: usize,
    /// Keys with a custom rate
    pub overrides: usize,
}

/// Token-bucket limiter keyed by cache key.
pub struct AdmissionController {
    default_limit: RateLimitConfig,
    buckets: DashMap<String, TokenBucket>,
    overrides: DashMap<String, RateLimitConfig>,
    eviction: Box<dyn BucketEviction>,
    clock: Arc<dyn Clock>,
    allowed: AtomicU64,
    denied: AtomicU64,
}

impl AdmissionController {
    pub fn new(default_limit: RateLimitConfig, eviction: Box<dyn BucketEviction>, clock: Arc<dyn Clock>) -> Self {
        Self {
            default_limit,
            buckets: DashMap::new(),
            overrides: DashMap::new(),
            eviction,
            clock,
            allowed: AtomicU64::new(0),
            denied: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CascadeConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.rate_limit, eviction::from_config(config), clock)
    }

    /// Take one token for `key`.
    pub fn allow(&self, key: &str) -> bool {
        self.check(key).is_allowed()
    }

    /// Take one token for `key`, reporting when to retry on denial.
    pub fn check(&self, key: &str) -> Admission {
        let now = self.clock.now();

        let result = if let Some(mut bucket) = self.buckets.get_mut(key) {
            bucket.try_acquire(now)
        } else {
            // Limit is read under the entry lock; clear_rate drops the
            // override before the bucket.
            let mut bucket = self.buckets.entry(key.to_string()).or_insert_with(|| {
                let limit = self.limit_for(key);
                debug!(key, rate = limit.rate_per_second, burst = limit.burst, "Created token bucket");
                TokenBucket::full(limit, now)
            });
            bucket.try_acquire(now)
        };

        match result {
            Ok(()) => {
                self.allowed.fetch_add(1, Ordering::Relaxed);
                crate::metrics::record_admission("allowed");
                Admission::Allowed
            }
            Err(retry_after) => {
                self.denied.fetch_add(1, Ordering::Relaxed);
                debug!(key, ?retry_after, "Rate limited");
                crate::metrics::record_admission("denied");
                Admission::Denied { retry_after }
            }
        }
    }

    /// Give `key` its own rate and burst, replacing its bucket with a full one.
    pub fn set_rate(&self, key: &str, limit: RateLimitConfig) {
        let now = self.clock.now();
        self.overrides.insert(key.to_string(), limit);
        self.buckets.insert(key.to_string(), TokenBucket::full(limit, now));
        info!(
            key,
            rate = limit.rate_per_second,
            burst = limit.burst,
            "Set custom rate"
        );
    }

    /// Drop `key`'s override. Its next check starts a fresh default bucket.
    ///
    /// The override goes first, then the bucket; `check` builds new buckets
    /// under the bucket entry lock, so none can outlive this call with the
    /// old limit.
    pub fn clear_rate(&self, key: &str) -> bool {
        let removed = self.overrides.remove(key).is_some();
        if removed {
            self.buckets.remove(key);
            info!(key, "Custom rate removed");
        }
        removed
    }

    /// Limit that applies to `key`.
    #[must_use]
    pub fn limit_for(&self, key: &str) -> RateLimitConfig {
        self.overrides
            .get(key)
            .map_or(self.default_limit, |limit| *limit)
    }

    /// Run one eviction pass, returning the number of buckets dropped.
    pub fn evict(&self) -> usize {
        let dropped = self.eviction.evict(&self.buckets, self.clock.now());
        info!(policy = self.eviction.name(), dropped, "Cleaned up token buckets");
        crate::metrics::record_bucket_eviction(dropped);
        dropped
    }

    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Tokens left in `key`'s bucket as of its last check.
    #[must_use]
    pub fn tokens(&self, key: &str) -> Option<f64> {
        self.buckets.get(key).map(|bucket| bucket.tokens())
    }

    #[must_use]
    pub fn stats(&self) -> AdmissionStats {
        AdmissionStats {
            allowed: self.allowed.load(Ordering::Relaxed),
            denied: self.denied.load(Ordering::Relaxed),
            buckets: self.buckets.len(),
            overrides: self.overrides.len(),
        }
    }
}
