//! Presence detection core for HAMonitor
//!
//! Turns a noisy stream of per-frame motion intensities into debounced
//! presence transitions. Designed to run anywhere the sensor runs.
//!
//! Key constraints:
//! - No heap allocation in the hot path
//! - Deterministic: same samples in, same events out
//! - Monotonic time only, never wall clock
//!
//! ```
//! use hamonitor_core::{IntensitySample, PresenceConfig, PresenceEvent, PresenceMachine};
//!
//! let mut machine = PresenceMachine::new(PresenceConfig::default());
//!
//! // Six seconds of strong motion at 10 Hz
//! let mut started = None;
//! for i in 0..=60u64 {
//!     let sample = IntensitySample::new(1_500_000, i * 100);
//!     if let Ok(Some(event)) = machine.feed(sample) {
//!         started = Some(event);
//!     }
//! }
//!
//! assert_eq!(started, Some(PresenceEvent::MotionStarted { at: 5_000 }));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod presence;
pub mod sample;
pub mod stream;
pub mod time;
pub mod traits;

// Public API
pub use config::{PresenceConfig, Profile};
pub use errors::{ConfigError, PresenceError, PresenceResult};
pub use events::PresenceEvent;
pub use presence::{MachineStats, PresenceMachine, PresenceState};
pub use sample::{IntensitySample, Threshold};
pub use traits::{IntensitySource, Stream, TimeSource};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
