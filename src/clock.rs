// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Monotonic time source shared by every cascade component.
//!
//! All expiry and refill arithmetic goes through [`Clock::now`], so tests can
//! swap in a [`ManualClock`] and move time forward deterministically.
//!
//! # Example
//!
//! ```
//! use hot_key_cascade::{Clock, ManualClock};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(10));
//! assert_eq!(clock.now() - start, Duration::from_secs(10));
//! ```

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Roughly a century. Deadlines that would overflow `Instant` land here instead.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Source of monotonic timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// `now() + ttl`, clamped so that huge TTLs cannot overflow.
    fn deadline(&self, ttl: Duration) -> Instant {
        deadline_after(self.now(), ttl)
    }
}

/// `now + ttl`, or a far-future instant when the sum does not fit.
pub(crate) fn deadline_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}
