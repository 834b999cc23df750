// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Hot-Key Cascade
//!
//! Hot-key mitigation in front of a shared key-value store.
//!
//! A small number of keys receiving a disproportionate share of traffic can
//! saturate a store. The cascade detects such keys, serves them from a local
//! fallback cache, and admits the remaining store reads for them through a
//! per-key token bucket. Cold keys pass straight through.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HotKeyDetector                         │
//! │  • Decaying per-key access counter (fixed window)          │
//! │  • Hot-key registry with TTL'd flags                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ hot
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      FallbackCache                          │
//! │  • DashMap of TTL'd values, hit/miss counters              │
//! │  • Only populated for hot keys                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ miss
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   AdmissionController                       │
//! │  • Lazily created token bucket per key                     │
//! │  • Per-key overrides, periodic bucket eviction             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ allowed (cold keys skip straight here)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      BackingStore                           │
//! │  • Redis (ConnectionManager) or in-memory                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hot_key_cascade::{CascadeConfig, HotKeyCascade, RedisStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CascadeConfig {
//!         threshold: 50,
//!         ..Default::default()
//!     };
//!     config.validate()?;
//!
//!     let store = RedisStore::with_prefix("redis://localhost:6379", Some("shop:")).await?;
//!     let cascade = HotKeyCascade::new(config, Arc::new(store));
//!     let maintenance = cascade.spawn_maintenance();
//!
//!     cascade.write("sku:42", b"in stock".to_vec()).await?;
//!     let outcome = cascade.read("sku:42").await?;
//!     println!("{:?} -> HTTP {}", outcome.source(), outcome.http_status_code());
//!
//!     maintenance.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`cascade`]: The [`HotKeyCascade`] orchestrator and its maintenance task
//! - [`detection`]: Access counting and the hot-key registry
//! - [`admission`]: Per-key token buckets and eviction policies
//! - [`fallback`]: Local TTL cache for hot keys
//! - [`storage`]: Backing store trait, Redis and in-memory implementations
//! - [`clock`]: Injectable monotonic time source

pub mod clock;
pub mod config;
pub mod storage;
pub mod detection;
pub mod admission;
pub mod fallback;
pub mod cascade;
pub mod metrics;

// Note: We don't expose a `tracing` module to avoid conflict with the tracing crate

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BucketEvictionMode, CascadeConfig, ConfigError, RateLimitConfig};
pub use cascade::{
    CascadeError, CascadeStats, HotKeyCascade, KeyStats, MaintenanceHandle, ReadOutcome, ReadSource,
    MAX_KEY_LEN,
};
pub use detection::{AccessWindow, DecayingCounter, DetectionConfig, HotKeyDetector, HotKeyRegistry};
pub use admission::{Admission, AdmissionController, AdmissionStats, BucketEviction, BulkReset, IdleEviction, TokenBucket};
pub use fallback::{FallbackCache, FallbackStats};
pub use storage::traits::{BackingStore, StorageError};
pub use storage::memory::InMemoryStore;
pub use storage::redis::RedisStore;
pub use storage::retry::Backoff;
pub use metrics::LatencyTimer;
