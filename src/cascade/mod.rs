// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Cascade orchestrator.
//!
//! [`HotKeyCascade`] ties the components together on the request path:
//!
//! ```text
//! read(key)
//!    │
//!    ▼
//! detector.record_and_check ──cold──────────────────────┐
//!    │ hot                                              │
//!    ▼                                                  │
//! fallback.lookup ──hit──→ Value(cache)                 │
//!    │ miss                                             │
//!    ▼                                                  │
//! admission.check ──denied──→ Throttled                 │
//!    │ allowed                                          ▼
//!    └────────────────────────────────────────→ store.get (no lock held)
//!                                                       │
//!                               absent → NotFound       │
//!                               hot → fallback.populate │
//!                                                       ▼
//!                                                 Value(store)
//! ```
//!
//! Each component is an owned instance behind an `Arc`, so several cascades
//! (e.g. one per namespace) can live in one process without sharing state.
//!
//! # Example
//!
//! ```rust,no_run
//! use hot_key_cascade::{CascadeConfig, HotKeyCascade, InMemoryStore, ReadOutcome};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cascade = HotKeyCascade::new(CascadeConfig::default(), Arc::new(InMemoryStore::new()));
//! let maintenance = cascade.spawn_maintenance();
//!
//! cascade.write("sku:42", b"in stock".to_vec()).await?;
//! match cascade.read("sku:42").await? {
//!     ReadOutcome::Value { value, source } => println!("{} from {}", value.len(), source),
//!     ReadOutcome::NotFound => println!("missing"),
//!     ReadOutcome::Throttled { retry_after } => println!("back off {:?}", retry_after),
//! }
//!
//! maintenance.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod types;
mod api;
mod maintenance;

pub use types::{CascadeError, CascadeStats, KeyStats, ReadOutcome, ReadSource};
pub use maintenance::MaintenanceHandle;

use std::sync::Arc;

use crate::admission::AdmissionController;
use crate::clock::{Clock, SystemClock};
use crate::config::CascadeConfig;
use crate::detection::{DetectionConfig, HotKeyDetector};
use crate::fallback::FallbackCache;
use crate::storage::traits::BackingStore;

/// Longest key accepted, in bytes.
pub const MAX_KEY_LEN: usize = 1024;

/// Hot-key mitigation cascade in front of one backing store.
///
/// # Thread Safety
///
/// `Send + Sync`; share it behind an `Arc`. Per-key state lives in sharded
/// concurrent maps, and no component lock is held across the store call.
pub struct HotKeyCascade {
    pub(super) config: CascadeConfig,
    pub(super) detector: Arc<HotKeyDetector>,
    pub(super) admission: Arc<AdmissionController>,
    pub(super) fallback: Arc<FallbackCache>,
    pub(super) store: Arc<dyn BackingStore>,
}

impl HotKeyCascade {
    /// Build a cascade on the system clock.
    pub fn new(config: CascadeConfig, store: Arc<dyn BackingStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Build a cascade whose components all read time from `clock`.
    pub fn with_clock(config: CascadeConfig, store: Arc<dyn BackingStore>, clock: Arc<dyn Clock>) -> Self {
        let detector = HotKeyDetector::new(DetectionConfig::from(&config), clock.clone());
        let admission = AdmissionController::from_config(&config, clock.clone());
        let fallback = FallbackCache::new(config.fallback_ttl(), clock);

        Self::from_parts(
            config,
            Arc::new(detector),
            Arc::new(admission),
            Arc::new(fallback),
            store,
        )
    }

    /// Assemble a cascade from pre-built components.
    pub fn from_parts(
        config: CascadeConfig,
        detector: Arc<HotKeyDetector>,
        admission: Arc<AdmissionController>,
        fallback: Arc<FallbackCache>,
        store: Arc<dyn BackingStore>,
    ) -> Self {
        Self {
            config,
            detector,
            admission,
            fallback,
            store,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    #[must_use]
    pub fn detector(&self) -> &HotKeyDetector {
        &self.detector
    }

    #[must_use]
    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    #[must_use]
    pub fn fallback(&self) -> &FallbackCache {
        &self.fallback
    }
}

/// Reject keys no component should ever see.
pub(crate) fn validate_key(key: &str) -> Result<(), CascadeError> {
    if key.is_empty() {
        return Err(CascadeError::InvalidKey("key is empty".to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(CascadeError::InvalidKey(format!(
            "key is {} bytes, limit is {}",
            key.len(),
            MAX_KEY_LEN
        )));
    }
    if key.chars().any(char::is_control) {
        return Err(CascadeError::InvalidKey("key contains control characters".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("user:42").is_ok());
        assert!(validate_key("日本語キー").is_ok());
        assert!(matches!(validate_key(""), Err(CascadeError::InvalidKey(_))));
        assert!(matches!(validate_key("a\nb"), Err(CascadeError::InvalidKey(_))));
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN)).is_ok());
        assert!(matches!(
            validate_key(&"k".repeat(MAX_KEY_LEN + 1)),
            Err(CascadeError::InvalidKey(_))
        ));
    }
}
