// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bucket eviction policies.
//!
//! Buckets are created lazily and otherwise live forever, so something has to
//! bound the map. Eviction runs on the maintenance cadence and takes the same
//! DashMap shard locks as `allow`, so a pass never observes a half-updated
//! bucket.
//!
//! - [`BulkReset`]: drop every bucket. Keys mid-burst get a full bucket back.
//! - [`IdleEviction`]: drop buckets untouched for `idle_for`. An active key
//!   keeps its token debt across passes.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::bucket::TokenBucket;
use crate::config::{BucketEvictionMode, CascadeConfig};

/// Decides which buckets an eviction pass discards.
pub trait BucketEviction: Send + Sync {
    fn name(&self) -> &'static str;

    /// Remove buckets from `buckets`, returning how many were dropped.
    fn evict(&self, buckets: &DashMap<String, TokenBucket>, now: Instant) -> usize;
}

/// Discard all buckets.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkReset;

impl BucketEviction for BulkReset {
    fn name(&self) -> &'static str {
        "bulk_reset"
    }

    fn evict(&self, buckets: &DashMap<String, TokenBucket>, _now: Instant) -> usize {
        let mut dropped = 0;
        buckets.retain(|_, _| {
            dropped += 1;
            false
        });
        dropped
    }
}

/// Discard buckets not consulted within `idle_for`.
#[derive(Debug, Clone, Copy)]
pub struct IdleEviction {
    pub idle_for: Duration,
}

impl BucketEviction for IdleEviction {
    fn name(&self) -> &'static str {
        "idle"
    }

    fn evict(&self, buckets: &DashMap<String, TokenBucket>, now: Instant) -> usize {
        let mut dropped = 0;
        buckets.retain(|_, bucket| {
            let keep = now.saturating_duration_since(bucket.last_seen()) < self.idle_for;
            if !keep {
                dropped += 1;
            }
            keep
        });
        dropped
    }
}

/// Build the policy selected by `config.bucket_eviction`.
#[must_use]
pub fn from_config(config: &CascadeConfig) -> Box<dyn BucketEviction> {
    match config.bucket_eviction {
        BucketEvictionMode::BulkReset => Box::new(BulkReset),
        BucketEvictionMode::Idle => Box::new(IdleEviction {
            idle_for: config.bucket_idle(),
        }),
    }
}
