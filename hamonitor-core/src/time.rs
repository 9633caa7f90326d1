//! Time management for presence detection
//!
//! All timing in the state machine is done on millisecond deltas between
//! sample timestamps. Timestamps come from a monotonic source so clock
//! adjustments (NTP, manual changes) cannot shorten a debounce or stretch a
//! cooldown.

use core::time::Duration;

pub use crate::traits::TimeSource;

/// Timestamp in milliseconds on a monotonic clock
pub type Timestamp = u64;

/// Milliseconds elapsed from `earlier` to `later`, zero if time did not advance
#[inline]
pub const fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}

/// Convert a duration to whole milliseconds, `None` if it overflows `u64`
pub fn duration_to_ms(duration: Duration) -> Option<u64> {
    u64::try_from(duration.as_millis()).ok()
}

/// Monotonic clock backed by `std::time::Instant`
///
/// Starts at 0 when created, always increases.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    /// Start a clock reading 0 now
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicClock {
    fn now(&self) -> Timestamp {
        duration_to_ms(self.origin.elapsed()).unwrap_or(Timestamp::MAX)
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Create a source frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Jump to an absolute timestamp
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Move forward by `ms`
    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}
