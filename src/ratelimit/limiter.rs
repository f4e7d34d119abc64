//! Core sliding-window rate limiter implementation.

use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, trace};

use super::clock::{duration_to_nanos, Clock, MonotonicClock};
use super::window::TimestampRing;

/// A rate limiter accepting at most `limit` events per trailing window.
///
/// Accepted events are recorded as timestamps in a fixed-size circular queue
/// sized to the maximum limit (`capacity`). Each admission attempt first
/// drops the timestamps that fell out of the window, then admits the event
/// if fewer than `limit` remain. For every admitted event, the number of
/// admitted events in the window ending at it never exceeds `limit`.
///
/// All operations run under a single mutex and the clock is read once per
/// call. The struct is `Send + Sync`; share it with an `Arc`.
///
/// Purging is lazy: [`len`](Self::len) reports the recorded count as is and
/// may include stale entries. Call [`purge`](Self::purge) first for an exact
/// count.
pub struct SlidingWindowLimiter<C: Clock = MonotonicClock> {
    /// Window length in nanoseconds
    window_nanos: i64,
    /// Window as configured
    window: Duration,
    /// Ring size, fixed at construction
    capacity: usize,
    /// Time source
    clock: C,
    /// Mutable state guarded by one lock
    state: Mutex<LimiterState>,
}

#[derive(Debug)]
struct LimiterState {
    /// Accepted event timestamps, oldest first
    ring: TimestampRing,
    /// Active admission threshold, always within `[0, capacity]`
    limit: usize,
}

impl LimiterState {
    fn purge(&mut self, now: i64, window_nanos: i64) -> usize {
        self.ring.purge_through(now.saturating_sub(window_nanos))
    }

    fn accept(&mut self, now: i64, window_nanos: i64) -> bool {
        let purged = self.purge(now, window_nanos);
        if purged > 0 {
            trace!(purged, remaining = self.ring.len(), "Purged stale events");
        }

        if self.ring.len() >= self.limit {
            trace!(
                len = self.ring.len(),
                limit = self.limit,
                oldest = ?self.ring.oldest(),
                "Event rejected"
            );
            return false;
        }

        self.ring.push(now)
    }
}

impl SlidingWindowLimiter<MonotonicClock> {
    /// Create a limiter accepting at most `max_n` events per `window`.
    ///
    /// The limit starts at `max_n` and may later be lowered with
    /// [`set_limit`](Self::set_limit). A `max_n` of zero rejects every event.
    pub fn new(max_n: usize, window: Duration) -> Self {
        Self::with_clock(max_n, window, MonotonicClock::new())
    }
}

impl<C: Clock> SlidingWindowLimiter<C> {
    /// Create a limiter reading time from `clock`.
    ///
    /// A zero `window` is accepted as is: every recorded event becomes stale
    /// as soon as it is compared against an equal or later instant.
    pub fn with_clock(max_n: usize, window: Duration, clock: C) -> Self {
        debug!(capacity = max_n, window = ?window, "Creating sliding window limiter");

        Self {
            window_nanos: duration_to_nanos(window),
            window,
            capacity: max_n,
            clock,
            state: Mutex::new(LimiterState {
                ring: TimestampRing::new(max_n),
                limit: max_n,
            }),
        }
    }

    /// Try to admit an event occurring now.
    ///
    /// Returns `true` and records the event when it fits in the window,
    /// `false` otherwise. Stale timestamps are purged either way.
    pub fn try_accept(&self) -> bool {
        let mut state = self.state.lock();
        let now = self.clock.now_nanos();
        state.accept(now, self.window_nanos)
    }

    /// Same as [`try_accept`](Self::try_accept) with the result inverted.
    ///
    /// Returns `true` when the event is rejected.
    pub fn try_reject(&self) -> bool {
        !self.try_accept()
    }

    /// Remove timestamps that are outside the window ending now.
    pub fn purge(&self) {
        let mut state = self.state.lock();
        let now = self.clock.now_nanos();
        let purged = state.purge(now, self.window_nanos);
        if purged > 0 {
            trace!(purged, remaining = state.ring.len(), "Purged stale events");
        }
    }

    /// Number of recorded timestamps. Does not purge.
    pub fn len(&self) -> usize {
        self.state.lock().ring.len()
    }

    /// Whether no timestamps are recorded. Does not purge.
    pub fn is_empty(&self) -> bool {
        self.state.lock().ring.is_empty()
    }

    /// Forget every recorded event. The limit is left unchanged.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        debug!(discarded = state.ring.len(), "Resetting limiter history");
        state.ring.clear();
    }

    /// Current maximum number of events accepted per window.
    pub fn limit(&self) -> usize {
        self.state.lock().limit
    }

    /// Set the maximum number of events accepted per window.
    ///
    /// `n` is clamped into `[0, capacity]`. Recorded events are kept, so a
    /// limit below [`len`](Self::len) blocks admissions until enough of them
    /// age out.
    pub fn set_limit(&self, n: i64) {
        let capacity = self.capacity;
        let mut state = self.state.lock();
        let limit = match usize::try_from(n) {
            Ok(n) => n.min(capacity),
            Err(_) => 0,
        };

        if i64::try_from(limit).ok() != Some(n) {
            debug!(requested = n, limit, capacity, "Clamped requested limit");
        } else {
            debug!(limit, "Limit updated");
        }
        state.limit = limit;
    }

    /// Restore the limit to the capacity given at construction.
    pub fn reset_limit(&self) {
        let mut state = self.state.lock();
        state.limit = self.capacity;
        debug!(limit = state.limit, "Limit reset to capacity");
    }

    /// Largest limit this limiter can ever be set to.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Length of the sliding window.
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl<C: Clock> std::fmt::Debug for SlidingWindowLimiter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SlidingWindowLimiter")
            .field("window", &self.window)
            .field("capacity", &self.capacity)
            .field("limit", &state.limit)
            .field("len", &state.ring.len())
            .finish()
    }
}
