use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Storage connection error: {0}")]
    Connection(String),
}

/// The authoritative key-value store the cascade protects.
///
/// A missing key is `Ok(None)`, never an error. Implementations own their
/// retry and timeout policy; the cascade surfaces any `Err` unchanged.
#[async_trait]
pub trait BackingStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write `value`, expiring after `ttl` when one is given.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StorageError>;

    /// Remove `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
