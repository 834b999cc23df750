// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the hot-key cascade.
//!
//! Uses the `metrics` crate facade. The embedding process installs whichever
//! exporter it wants (Prometheus, OTEL, ...); without one every call is a no-op.
//!
//! # Metric Naming Convention
//! - `hot_key_cascade_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `operation`: read, write, delete
//! - `outcome`: cache, store, not_found, throttled, error
//! - `decision`: allowed, denied

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a completed cascade operation
pub fn record_operation(operation: &str, outcome: &str) {
    counter!(
        "hot_key_cascade_operations_total",
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(operation: &str, duration: Duration) {
    histogram!(
        "hot_key_cascade_operation_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a backing store failure
pub fn record_store_error(operation: &str) {
    counter!(
        "hot_key_cascade_store_errors_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record a key crossing the hot threshold
pub fn record_hot_key_detected() {
    counter!("hot_key_cascade_hot_keys_detected_total").increment(1);
}

/// Record an admission decision
pub fn record_admission(decision: &str) {
    counter!(
        "hot_key_cascade_admission_total",
        "decision" => decision.to_string()
    )
    .increment(1);
}

/// Record buckets dropped by an eviction pass
pub fn record_bucket_eviction(count: usize) {
    counter!("hot_key_cascade_bucket_evictions_total").increment(count as u64);
}

/// Record expired state removed by the janitor
pub fn record_purge(kind: &str, count: usize) {
    counter!(
        "hot_key_cascade_purged_total",
        "kind" => kind.to_string()
    )
    .increment(count as u64);
}

/// Set the number of live hot keys
pub fn set_hot_keys(count: usize) {
    gauge!("hot_key_cascade_hot_keys").set(count as f64);
}

/// Set the number of keys with access records
pub fn set_tracked_keys(count: usize) {
    gauge!("hot_key_cascade_tracked_keys").set(count as f64);
}

/// Set the number of fallback cache entries
pub fn set_fallback_entries(count: usize) {
    gauge!("hot_key_cascade_fallback_entries").set(count as f64);
}

/// Set the number of live token buckets
pub fn set_buckets(count: usize) {
    gauge!("hot_key_cascade_token_buckets").set(count as f64);
}

/// A timing guard that records latency on drop
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.operation, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // No recorder installed: these only check the calls don't panic.

    #[test]
    fn test_counters() {
        record_operation("read", "cache");
        record_operation("read", "throttled");
        record_store_error("write");
        record_hot_key_detected();
        record_admission("allowed");
        record_admission("denied");
        record_bucket_eviction(12);
        record_purge("access_records", 3);
    }

    #[test]
    fn test_gauges() {
        set_hot_keys(4);
        set_tracked_keys(1000);
        set_fallback_entries(4);
        set_buckets(2);
    }

    #[test]
    fn test_latency_timer() {
        {
            let _timer = LatencyTimer::new("read");
            std::thread::sleep(Duration::from_micros(10));
        }
    }
}
