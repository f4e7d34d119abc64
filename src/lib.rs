//! Slidewin - Sliding Window Rate Limiter
//!
//! This crate implements a thread-safe rate limiter that admits at most N
//! events in any trailing window of length ΔT. Accepted event timestamps are
//! kept in a fixed-size circular buffer and stale entries are purged lazily
//! on each admission attempt.

pub mod config;
pub mod error;
pub mod probe;
pub mod ratelimit;

pub use ratelimit::SlidingWindowLimiter;
