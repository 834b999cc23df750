// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Short-TTL local copy of hot values.
//!
//! Consulted before the backing store for hot keys only. Entries are written
//! after a successful store read (or a write) for a hot key and disappear on
//! TTL expiry or explicit invalidation.
//!
//! # Flow
//!
//! ```text
//! hot read
//!    │
//!    ▼
//! ┌──────────────────────────┐
//! │  lookup(key)             │
//! │  live entry?             │
//! └──────────────────────────┘
//!    │
//!    ├─→ Hit → serve locally, store untouched
//!    │
//!    └─→ Miss → admission → store → populate(key, value, ttl)
//! ```

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::clock::Clock;

#[derive(Clone, Debug)]
struct FallbackEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Fallback cache statistics
#[derive(Debug, Clone)]
pub struct FallbackStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries held, including expired ones not yet purged
    pub entry_count: usize,
    /// Hit rate (0.0 - 1.0)
    pub hit_rate: f64,
}

/// TTL-keyed local value store.
pub struct FallbackCache {
    entries: DashMap<String, FallbackEntry>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FallbackCache {
    pub fn new(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Live value for `key`, counting a hit or miss.
    pub fn lookup(&self, key: &str) -> Option<Vec<u8>> {
        let now = self.clock.now();

        if let Some(entry) = self.entries.get(key) {
            if now < entry.expires_at {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            drop(entry); // Release read lock before removing
            self.entries.remove_if(key, |_, entry| now >= entry.expires_at);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store `value` for `ttl`, replacing any previous entry.
    pub fn populate(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let expires_at = self.clock.deadline(ttl);
        self.entries.insert(key.to_string(), FallbackEntry { value, expires_at });
        debug!(key, ?ttl, "Hot key cached");
    }

    /// Store `value` for the default TTL.
    pub fn populate_default(&self, key: &str, value: Vec<u8>) {
        self.populate(key, value, self.default_ttl);
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Whether a live entry exists, without touching hit/miss counters.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.entries
            .get(key)
            .map_or(false, |entry| now < entry.expires_at)
    }

    /// Live values for every key in `keys` that has one.
    pub fn get_many<'a, I>(&self, keys: I) -> HashMap<String, Vec<u8>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter()
            .filter_map(|key| self.lookup(key).map(|value| (key.to_string(), value)))
            .collect()
    }

    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        before.saturating_sub(self.entries.len())
    }

    pub fn clear(&self) {
        self.entries.clear();
        debug!("Fallback cache flushed");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> FallbackStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        FallbackStats {
            hits,
            misses,
            entry_count: self.entries.len(),
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}
