//! Public types for the cascade orchestrator.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::admission::AdmissionStats;
use crate::config::ConfigError;
use crate::fallback::FallbackStats;
use crate::storage::traits::StorageError;

/// Where a served value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadSource {
    /// Local fallback cache (hot key)
    Cache,
    /// Backing store
    Store,
}

impl std::fmt::Display for ReadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Store => write!(f, "store"),
        }
    }
}

/// Non-error result of a read.
///
/// Throttling and absence are normal outcomes. Only a failing backing store
/// produces an `Err` (see [`CascadeError::StoreUnavailable`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Value { value: Vec<u8>, source: ReadSource },
    NotFound,
    /// Admission denied for a hot key; the store was not contacted.
    /// `retry_after` is `None` if the key's bucket never refills.
    Throttled { retry_after: Option<Duration> },
}

impl ReadOutcome {
    /// The value, if one was served.
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Self::Value { value, .. } => Some(value.as_slice()),
            _ => None,
        }
    }

    #[must_use]
    pub fn source(&self) -> Option<ReadSource> {
        match self {
            Self::Value { source, .. } => Some(*source),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }

    /// Metric label for this outcome.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Value { source: ReadSource::Cache, .. } => "cache",
            Self::Value { source: ReadSource::Store, .. } => "store",
            Self::NotFound => "not_found",
            Self::Throttled { .. } => "throttled",
        }
    }

    /// Suggested HTTP status code for a transport wrapping this outcome
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Value { .. } => 200,
            Self::NotFound => 404,
            Self::Throttled { .. } => 429,
        }
    }
}

#[derive(Error, Debug)]
pub enum CascadeError {
    /// Rejected before touching any component
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("value must not be empty")]
    EmptyValue,
    #[error(transparent)]
    InvalidRate(#[from] ConfigError),
    /// The backing store call failed. Not retried at this layer.
    #[error("backing store unavailable: {0}")]
    StoreUnavailable(#[source] StorageError),
}

impl CascadeError {
    /// Suggested HTTP status code for a transport wrapping this error
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidKey(_) | Self::EmptyValue | Self::InvalidRate(_) => 400,
            Self::StoreUnavailable(_) => 503,
        }
    }
}

/// Per-key view returned by `stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyStats {
    pub key: String,
    pub access_count: u64,
    pub is_hot: bool,
    pub in_fallback_cache: bool,
}

/// Aggregate view over all components.
#[derive(Debug, Clone)]
pub struct CascadeStats {
    pub hot_keys: usize,
    pub tracked_keys: usize,
    pub fallback: FallbackStats,
    pub admission: AdmissionStats,
}
