// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Bounded exponential backoff for backing store calls.
//!
//! Retrying is the store's business: the cascade never retries a failed
//! read or write, so a store that wants to ride out a blip wraps its own
//! commands here.
//!
//! # Example
//!
//! ```
//! use hot_key_cascade::storage::retry::Backoff;
//!
//! let connect = Backoff::connect();
//! assert_eq!(connect.max_attempts, 5);
//!
//! let command = Backoff::command();
//! assert_eq!(command.max_attempts, 2);
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Backoff schedule: `initial_delay`, growing by `factor`, capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct Backoff {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    /// Total attempts including the first one
    pub max_attempts: usize,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::command()
    }
}

impl Backoff {
    /// Initial connection: ~3 s total before giving up on a bad URL.
    #[must_use]
    pub fn connect() -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
            max_attempts: 5,
        }
    }

    /// Per-command: one quick retry, then surface the error. Request latency
    /// matters more than masking an outage.
    #[must_use]
    pub fn command() -> Self {
        Self {
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(20),
            factor: 1.0,
            max_attempts: 2,
        }
    }

    /// Single attempt.
    #[must_use]
    pub fn none() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            factor: 1.0,
            max_attempts: 1,
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        delay.mul_f64(self.factor).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds or `backoff.max_attempts` is spent.
pub async fn with_backoff<F, Fut, T, E>(
    operation_name: &str,
    backoff: &Backoff,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = backoff.initial_delay;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(val) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "Store call recovered");
                }
                return Ok(val);
            }
            Err(err) if attempt >= backoff.max_attempts.max(1) => return Err(err),
            Err(err) => {
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = backoff.max_attempts,
                    error = %err,
                    retry_in = ?delay,
                    "Store call failed, retrying"
                );
                sleep(delay).await;
                delay = backoff.next_delay(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fast(max_attempts: usize) -> Backoff {
        Backoff {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            factor: 2.0,
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_first_try_success() {
        let result: Result<u8, String> = with_backoff("get", &fast(3), || async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_recovers_within_budget() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<&str, String> = with_backoff("get", &fast(3), || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("connection reset".to_string())
                } else {
                    Ok("value")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "value");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<(), String> = with_backoff("set", &fast(4), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("down".to_string())
            }
        })
        .await;

        assert_eq!(result.unwrap_err(), "down");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_none_makes_one_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let _: Result<(), String> = with_backoff("del", &Backoff::none(), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("down".to_string())
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_grows_then_caps() {
        let backoff = Backoff {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            factor: 2.0,
            max_attempts: 5,
        };

        let d1 = backoff.next_delay(backoff.initial_delay);
        assert_eq!(d1, Duration::from_millis(200));
        let d2 = backoff.next_delay(d1);
        assert_eq!(d2, Duration::from_millis(300));
    }
}
