//! Time sources for the limiter.
//!
//! Timestamps are plain `i64` nanoseconds. Only differences between readings
//! of the same clock matter, so each clock is free to pick its own origin.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A source of "now" readings with nanosecond resolution.
pub trait Clock: Send + Sync {
    /// Current instant in nanoseconds relative to the clock's origin.
    fn now_nanos(&self) -> i64;
}

/// Monotonic clock measuring nanoseconds since its creation.
///
/// This is the default clock: readings never go backward, so the ring stays
/// in chronological order.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose origin is the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_nanos(&self) -> i64 {
        duration_to_nanos(self.origin.elapsed())
    }
}

/// Wall clock reporting nanoseconds since the Unix epoch.
///
/// The wall clock can be stepped backward by the OS. The limiter does not
/// correct for that: a backward step records entries that look older than
/// their predecessors, and they age out under the same `<=` rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_nanos(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => duration_to_nanos(since),
            Err(before) => -duration_to_nanos(before.duration()),
        }
    }
}

/// Manually driven clock for tests and simulations.
///
/// Clones share the same instant, so a test can keep one handle and give
/// another to the limiter.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock starting at `start` nanoseconds.
    pub fn new(start: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start)),
        }
    }

    /// Move the clock forward by `by`. Use [`ManualClock::set`] to step back.
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(duration_to_nanos(by), Ordering::SeqCst);
    }

    /// Set the clock to an absolute reading.
    pub fn set(&self, nanos: i64) {
        self.now.store(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Convert a duration to nanoseconds, saturating at `i64::MAX`.
pub(crate) fn duration_to_nanos(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}
