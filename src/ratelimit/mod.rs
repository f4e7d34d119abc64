//! Sliding-window rate limiting.

mod clock;
mod limiter;
mod window;

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use limiter::SlidingWindowLimiter;
