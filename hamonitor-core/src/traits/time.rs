//! Time Source Abstraction
//!
//! ## Design Goals
//!
//! - **Testability**: easy to freeze or step for deterministic tests
//! - **Monotonicity**: presence timers must never see time go backwards
//! - **Platform Independence**: works with `std::time::Instant` or a hardware timer
//!
//! ## Common Implementations
//!
//! - `MonotonicClock`: `Instant`-based, milliseconds since creation (std)
//! - `FixedTime`: controllable time for testing

use crate::time::Timestamp;

/// Source of time for sample stamping
///
/// Sources that already stamp their own samples (a driver callback that
/// reports frame time, a replay file) never consult this.
///
/// ## Implementation Requirements
///
/// - `now()` should be monotonic; wall clock sources may jump on NTP updates
///   and will be flagged by [`TimeSource::is_wall_clock`]
/// - Timestamp overflow must saturate rather than wrap
pub trait TimeSource: Send {
    /// Current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Whether this source follows wall clock time (and may be adjusted)
    fn is_wall_clock(&self) -> bool;
}
