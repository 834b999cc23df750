// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Hot-key detection.
//!
//! Composes an [`AccessWindow`] (how often is this key read?) with a
//! [`HotKeyRegistry`] (which keys are hot right now?).
//!
//! ```text
//! record_and_check(key)
//!       │
//!       ├─→ flag live?  ──yes──→ hot (no recount)
//!       │
//!       ▼
//! count = window.record(key)
//!       │
//!       ├─→ count ≥ threshold ──→ mark_hot(key, ttl) → hot
//!       │
//!       └─→ cold
//! ```
//!
//! Once granted, hot status is not re-derived from fresh counts: it lasts for
//! the flag TTL even if the key goes quiet.

pub mod counter;
pub mod registry;

pub use counter::{AccessWindow, DecayingCounter};
pub use registry::HotKeyRegistry;

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::clock::Clock;
use crate::config::CascadeConfig;

/// Detection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionConfig {
    /// Accesses within one window that make a key hot
    pub threshold: u64,
    /// Counting window
    pub window: Duration,
    /// How long a hot flag lives once set
    pub hot_key_ttl: Duration,
}

impl From<&CascadeConfig> for DetectionConfig {
    fn from(config: &CascadeConfig) -> Self {
        Self {
            threshold: config.threshold,
            window: config.window(),
            hot_key_ttl: config.hot_key_ttl(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        (&CascadeConfig::default()).into()
    }
}

/// Threshold-crossing detector over a counter and a registry.
pub struct HotKeyDetector {
    config: DetectionConfig,
    window: Box<dyn AccessWindow>,
    registry: HotKeyRegistry,
}

impl HotKeyDetector {
    /// Detector using the decaying-window counter.
    pub fn new(config: DetectionConfig, clock: Arc<dyn Clock>) -> Self {
        let window = DecayingCounter::new(config.window, clock.clone());
        Self::with_window(config, Box::new(window), clock)
    }

    /// Detector over a caller-supplied access window.
    pub fn with_window(config: DetectionConfig, window: Box<dyn AccessWindow>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            window,
            registry: HotKeyRegistry::new(clock),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Record one access to `key` and report whether it is hot.
    pub fn record_and_check(&self, key: &str) -> bool {
        if self.registry.is_hot(key) {
            return true;
        }

        let count = self.window.record(key);
        if count >= self.config.threshold {
            info!(
                key,
                count,
                window = ?self.config.window,
                "Hot key detected"
            );
            self.registry.mark_hot(key, self.config.hot_key_ttl);
            crate::metrics::record_hot_key_detected();
            return true;
        }

        false
    }

    #[must_use]
    pub fn is_hot(&self, key: &str) -> bool {
        self.registry.is_hot(key)
    }

    /// Accesses counted for `key` in its current window.
    #[must_use]
    pub fn access_count(&self, key: &str) -> u64 {
        self.window.count(key)
    }

    /// Manually unmark `key`. Its access count is kept.
    pub fn clear(&self, key: &str) -> bool {
        self.registry.clear(key)
    }

    #[must_use]
    pub fn hot_keys(&self) -> Vec<String> {
        self.registry.hot_keys()
    }

    #[must_use]
    pub fn registry(&self) -> &HotKeyRegistry {
        &self.registry
    }

    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.window.len()
    }

    /// Drop expired access records and hot flags.
    ///
    /// Returns `(records, flags)` removed.
    pub fn purge_expired(&self) -> (usize, usize) {
        (self.window.purge_expired(), self.registry.purge_expired())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn detector(threshold: u64) -> (HotKeyDetector, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let config = DetectionConfig {
            threshold,
            window: Duration::from_secs(10),
            hot_key_ttl: Duration::from_secs(300),
        };
        (HotKeyDetector::new(config, clock.clone()), clock)
    }

    #[test]
    fn test_below_threshold_stays_cold() {
        let (detector, _) = detector(3);
        assert!(!detector.record_and_check("k"));
        assert!(!detector.record_and_check("k"));
        assert!(!detector.is_hot("k"));
        assert_eq!(detector.access_count("k"), 2);
    }

    #[test]
    fn test_threshold_crossing_marks_hot() {
        let (detector, _) = detector(3);
        detector.record_and_check("k");
        detector.record_and_check("k");
        assert!(detector.record_and_check("k"));
        assert!(detector.is_hot("k"));
        assert_eq!(detector.hot_keys(), vec!["k".to_string()]);
    }

    #[test]
    fn test_hot_flag_outlives_quiet_period_until_ttl() {
        let (detector, clock) = detector(3);
        for _ in 0..3 {
            detector.record_and_check("k");
        }

        clock.advance(Duration::from_secs(299));
        assert!(detector.is_hot("k"));

        clock.advance(Duration::from_secs(1));
        assert!(!detector.is_hot("k"));
    }

    #[test]
    fn test_hot_key_skips_recount() {
        let (detector, _) = detector(3);
        for _ in 0..3 {
            detector.record_and_check("k");
        }
        for _ in 0..10 {
            assert!(detector.record_and_check("k"));
        }
        assert_eq!(detector.access_count("k"), 3);
    }

    #[test]
    fn test_slow_accesses_never_cross_threshold() {
        let (detector, clock) = detector(3);
        for _ in 0..10 {
            assert!(!detector.record_and_check("k"));
            clock.advance(Duration::from_secs(11));
        }
    }

    #[test]
    fn test_clear_then_recross() {
        let (detector, _) = detector(2);
        detector.record_and_check("k");
        detector.record_and_check("k");
        assert!(detector.clear("k"));
        assert!(!detector.is_hot("k"));

        // Count is still at threshold, so the next access re-flags immediately
        assert!(detector.record_and_check("k"));
    }

    struct FixedWindow(u64);

    impl AccessWindow for FixedWindow {
        fn record(&self, _key: &str) -> u64 { self.0 }
        fn count(&self, _key: &str) -> u64 { self.0 }
        fn forget(&self, _key: &str) {}
        fn purge_expired(&self) -> usize { 0 }
        fn len(&self) -> usize { 0 }
    }

    #[test]
    fn test_custom_window_is_consulted() {
        let clock = Arc::new(ManualClock::new());
        let config = DetectionConfig { threshold: 50, ..Default::default() };
        let detector = HotKeyDetector::with_window(config, Box::new(FixedWindow(50)), clock);
        assert!(detector.record_and_check("anything"));
    }

    #[test]
    fn test_config_from_cascade_config() {
        let config = DetectionConfig::default();
        assert_eq!(config.threshold, 100);
        assert_eq!(config.window, Duration::from_secs(10));
        assert_eq!(config.hot_key_ttl, Duration::from_secs(300));
    }
}
