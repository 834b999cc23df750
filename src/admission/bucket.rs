//! Continuous-refill token bucket.

use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// Absorbs float drift so that waiting exactly `1 / rate` yields a whole token.
const TOKEN_EPSILON: f64 = 1e-9;

/// Token bucket for a single key.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: u32,
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl TokenBucket {
    /// A bucket holding `limit.burst` tokens.
    #[must_use]
    pub fn full(limit: RateLimitConfig, now: Instant) -> Self {
        Self {
            capacity: limit.burst,
            refill_rate: if limit.rate_per_second.is_finite() {
                limit.rate_per_second.max(0.0)
            } else {
                0.0
            },
            tokens: f64::from(limit.burst),
            last_refill: now,
            last_seen: now,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[must_use]
    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Tokens held as of the last refill.
    #[must_use]
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Last time this bucket was asked for a token.
    #[must_use]
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(f64::from(self.capacity));
        self.last_refill = now;
    }

    /// Refill, then take one token if available.
    ///
    /// On denial returns how long until a token will be available, or `None`
    /// if the bucket can never refill (zero rate or zero capacity) or the wait
    /// is too long for a `Duration`.
    pub fn try_acquire(&mut self, now: Instant) -> Result<(), Option<Duration>> {
        self.refill(now);
        self.last_seen = now;

        if self.tokens + TOKEN_EPSILON >= 1.0 {
            self.tokens = (self.tokens - 1.0).max(0.0);
            return Ok(());
        }

        Err(self.time_to_next_token())
    }

    fn time_to_next_token(&self) -> Option<Duration> {
        if self.refill_rate <= 0.0 || self.capacity == 0 {
            return None;
        }
        let deficit = (1.0 - self.tokens).max(0.0);
        Duration::try_from_secs_f64(deficit / self.refill_rate).ok()
    }
}
