//! Configuration for the hot-key cascade.
//!
//! # Example
//!
//! ```
//! use hot_key_cascade::CascadeConfig;
//! use std::time::Duration;
//!
//! // Minimal config (uses defaults)
//! let config = CascadeConfig::default();
//! assert_eq!(config.threshold, 100);
//! assert_eq!(config.window(), Duration::from_secs(10));
//!
//! // Tighter detection for a small keyspace
//! let config = CascadeConfig {
//!     threshold: 20,
//!     window_ms: 2_000,
//!     hot_key_ttl_secs: 60,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Configuration for the hot-key cascade.
///
/// All fields have defaults matching a single-instance deployment in front of
/// one Redis. Durations are stored as integers so the struct deserializes from
/// flat TOML/JSON/env sources.
#[derive(Debug, Clone, Deserialize)]
pub struct CascadeConfig {
    /// Accesses within one window needed to flag a key hot (default: 100)
    #[serde(default = "default_threshold")]
    pub threshold: u64,

    /// Detection window in milliseconds (default: 10 s)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Lifetime of a hot flag in seconds (default: 5 min)
    #[serde(default = "default_hot_key_ttl_secs")]
    pub hot_key_ttl_secs: u64,

    /// Default token bucket for hot keys
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Fallback cache entry lifetime in seconds (default: 5 min)
    #[serde(default = "default_fallback_ttl_secs")]
    pub fallback_ttl_secs: u64,

    /// How often bucket eviction runs, in seconds (default: 1 hour)
    #[serde(default = "default_bucket_reset_interval_secs")]
    pub bucket_reset_interval_secs: u64,

    /// Which buckets an eviction pass discards
    #[serde(default)]
    pub bucket_eviction: BucketEvictionMode,

    /// Idle time before a bucket is evicted in `idle` mode (default: 10 min)
    #[serde(default = "default_bucket_idle_secs")]
    pub bucket_idle_secs: u64,

    /// TTL applied to backing store writes, 0 = no expiry (default: 1 hour)
    #[serde(default = "default_store_ttl_secs")]
    pub store_ttl_secs: u64,

    /// Janitor cadence for purging expired records, flags and entries (default: 60 s)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// Token bucket parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RateLimitConfig {
    /// Sustained refill rate (tokens per second)
    #[serde(default = "default_rate_per_second")]
    pub rate_per_second: f64,
    /// Bucket capacity (maximum burst)
    #[serde(default = "default_burst")]
    pub burst: u32,
}

impl RateLimitConfig {
    #[must_use]
    pub fn new(rate_per_second: f64, burst: u32) -> Self {
        Self { rate_per_second, burst }
    }

    /// Reject rates that are negative or not finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.rate_per_second;
        if !rate.is_finite() || rate < 0.0 {
            return Err(ConfigError::InvalidRate(format!(
                "rate_per_second must be a finite non-negative number, got {}",
                rate
            )));
        }
        Ok(())
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate_per_second: default_rate_per_second(),
            burst: default_burst(),
        }
    }
}

/// Bucket eviction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketEvictionMode {
    /// Discard every bucket on each pass
    #[default]
    BulkReset,
    /// Discard only buckets untouched for `bucket_idle_secs`
    Idle,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("threshold must be at least 1")]
    ZeroThreshold,
    #[error("detection window must be non-zero")]
    ZeroWindow,
    #[error("invalid rate limit: {0}")]
    InvalidRate(String),
}

fn default_threshold() -> u64 { 100 }
fn default_window_ms() -> u64 { 10_000 } // 10 s
fn default_hot_key_ttl_secs() -> u64 { 300 } // 5 min
fn default_rate_per_second() -> f64 { 10.0 }
fn default_burst() -> u32 { 20 }
fn default_fallback_ttl_secs() -> u64 { 300 } // 5 min
fn default_bucket_reset_interval_secs() -> u64 { 3600 } // 1 hour
fn default_bucket_idle_secs() -> u64 { 600 }
fn default_store_ttl_secs() -> u64 { 3600 }
fn default_cleanup_interval_secs() -> u64 { 60 }

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            window_ms: default_window_ms(),
            hot_key_ttl_secs: default_hot_key_ttl_secs(),
            rate_limit: RateLimitConfig::default(),
            fallback_ttl_secs: default_fallback_ttl_secs(),
            bucket_reset_interval_secs: default_bucket_reset_interval_secs(),
            bucket_eviction: BucketEvictionMode::default(),
            bucket_idle_secs: default_bucket_idle_secs(),
            store_ttl_secs: default_store_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl CascadeConfig {
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    #[must_use]
    pub fn hot_key_ttl(&self) -> Duration {
        Duration::from_secs(self.hot_key_ttl_secs)
    }

    #[must_use]
    pub fn fallback_ttl(&self) -> Duration {
        Duration::from_secs(self.fallback_ttl_secs)
    }

    #[must_use]
    pub fn bucket_reset_interval(&self) -> Duration {
        Duration::from_secs(self.bucket_reset_interval_secs)
    }

    #[must_use]
    pub fn bucket_idle(&self) -> Duration {
        Duration::from_secs(self.bucket_idle_secs)
    }

    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Store write TTL, `None` when writes should not expire.
    #[must_use]
    pub fn store_ttl(&self) -> Option<Duration> {
        (self.store_ttl_secs > 0).then(|| Duration::from_secs(self.store_ttl_secs))
    }

    /// Reject configurations the components cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.window_ms == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        self.rate_limit.validate()
    }
}
