//! Redis backing store.
//!
//! Values are stored as plain Redis strings (raw bytes). Writes with a TTL use
//! `PSETEX` so sub-second expiries survive; writes without one use `SET`.
//!
//! Every command goes through [`Backoff::command`]: one short retry to absorb
//! a reconnect in the [`ConnectionManager`], then the error is surfaced.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;
use tracing::info;

use super::retry::{with_backoff, Backoff};
use super::traits::{BackingStore, StorageError};

/// Redis rejects expiries that overflow its clock; a century is plenty.
const MAX_TTL_MS: u64 = 100 * 365 * 24 * 3600 * 1000;

/// PSETEX milliseconds for `ttl`, clamped to `1..=MAX_TTL_MS` (PSETEX rejects 0).
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).clamp(1, MAX_TTL_MS)
}

pub struct RedisStore {
    connection: ConnectionManager,
    /// Optional key prefix for namespacing (e.g., "shop:" → "shop:sku.42")
    prefix: String,
    backoff: Backoff,
}

impl RedisStore {
    /// Connect without a key prefix.
    pub async fn new(connection_string: &str) -> Result<Self, StorageError> {
        Self::with_prefix(connection_string, None).await
    }

    /// Connect with an optional key prefix prepended to every key.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use hot_key_cascade::storage::redis::RedisStore;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = RedisStore::with_prefix("redis://localhost", Some("shop:")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_prefix(connection_string: &str, prefix: Option<&str>) -> Result<Self, StorageError> {
        let client = Client::open(connection_string)
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let connection = with_backoff("redis_connect", &Backoff::connect(), || {
            ConnectionManager::new(client.clone())
        })
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        info!(prefix = prefix.unwrap_or(""), "Connected to Redis backing store");

        Ok(Self {
            connection,
            prefix: prefix.unwrap_or("").to_string(),
            backoff: Backoff::command(),
        })
    }

    /// Replace the per-command retry schedule.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[inline]
    fn prefixed_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}{}", self.prefix, key)
        }
    }
}

#[async_trait]
impl BackingStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key = self.prefixed_key(key);

        with_backoff("redis_get", &self.backoff, || {
            let mut conn = self.connection.clone();
            let key = key.clone();
            async move { conn.get::<_, Option<Vec<u8>>>(&key).await }
        })
        .await
        .map_err(|e: redis::RedisError| StorageError::Backend(e.to_string()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StorageError> {
        let key = self.prefixed_key(key);
        let ttl_ms = ttl.map(ttl_millis);

        with_backoff("redis_set", &self.backoff, || {
            let mut conn = self.connection.clone();
            let key = key.clone();
            async move {
                match ttl_ms {
                    Some(ms) => conn.pset_ex::<_, _, ()>(&key, value, ms).await,
                    None => conn.set::<_, _, ()>(&key, value).await,
                }
            }
        })
        .await
        .map_err(|e: redis::RedisError| StorageError::Backend(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let key = self.prefixed_key(key);

        with_backoff("redis_delete", &self.backoff, || {
            let mut conn = self.connection.clone();
            let key = key.clone();
            async move { conn.del::<_, ()>(&key).await }
        })
        .await
        .map_err(|e: redis::RedisError| StorageError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_connection_error() {
        let result = RedisStore::new("not a redis url").await;
        assert!(matches!(result, Err(StorageError::Connection(_))));
    }

    #[test]
    fn test_ttl_millis_clamps() {
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::from_secs(60)), 60_000);
        assert_eq!(ttl_millis(Duration::from_secs(u64::MAX)), MAX_TTL_MS);
    }
}
