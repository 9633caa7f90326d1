//! Error Types for Presence Detection
//!
//! ## Design Philosophy
//!
//! Errors here sit on the per-frame hot path, so they follow the same rules as
//! the rest of the core:
//!
//! 1. **Small Size**: every variant is a handful of integers.
//! 2. **No Heap Allocation**: messages are `&'static str`, never `String`.
//! 3. **Copy Semantics**: errors are returned by value and may be counted or
//!    logged without ownership concerns.
//!
//! ## Error Categories
//!
//! ### Sample Rejections
//! - `StaleSample`: timestamp did not advance. The sample is dropped and the
//!   state machine is left exactly as it was.
//!
//! ### Configuration Problems
//! - `ConfigError`: detected once at startup. These are fatal for the process;
//!   restarting with the same configuration cannot fix them.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use hamonitor_core::{IntensitySample, PresenceConfig, PresenceError, PresenceMachine};
//!
//! let mut machine = PresenceMachine::new(PresenceConfig::default());
//! machine.feed(IntensitySample::new(0, 1_000)).unwrap();
//!
//! match machine.feed(IntensitySample::new(0, 900)) {
//!     Err(PresenceError::StaleSample { timestamp, last_seen }) => {
//!         assert_eq!((timestamp, last_seen), (900, 1_000));
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use thiserror_no_std::Error;

use crate::time::Timestamp;

/// Result type for state machine operations
pub type PresenceResult<T> = Result<T, PresenceError>;

/// Errors raised while feeding samples
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceError {
    /// Sample timestamp is not after the last accepted one
    #[error("Stale sample at {timestamp}ms (last accepted {last_seen}ms)")]
    StaleSample {
        /// Timestamp carried by the rejected sample
        timestamp: Timestamp,
        /// Timestamp of the most recent accepted sample
        last_seen: Timestamp,
    },
}

/// Invalid presence configuration
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Cooldown must be a positive duration
    #[error("Cooldown window must be greater than zero")]
    ZeroCooldown,

    /// Re-affirmation interval, when set, must be a positive duration
    #[error("Re-affirmation interval must be greater than zero")]
    ZeroReaffirmInterval,

    /// Averaging window, when set, must be a positive duration
    #[error("Averaging window must be greater than zero")]
    ZeroAveragingWindow,

    /// A duration does not fit in the millisecond timestamp range
    #[error("Duration for {field} is too large")]
    DurationOverflow {
        /// Name of the offending setting
        field: &'static str,
    },

    /// Profile name not recognised
    #[error("Unknown profile (expected `oneshot` or `runloop`)")]
    UnknownProfile,
}

#[cfg(feature = "defmt")]
impl defmt::Format for PresenceError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::StaleSample { timestamp, last_seen } =>
                defmt::write!(fmt, "Stale sample {}ms <= {}ms", timestamp, last_seen),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_stay_small() {
        assert!(core::mem::size_of::<PresenceError>() <= 24);
        assert!(core::mem::size_of::<ConfigError>() <= 24);
    }
}
