//! Core Traits for HAMonitor
//!
//! The two seams between the presence core and the outside world:
//!
//! - [`time`] - where "now" comes from when a sample source has no clock of its own
//! - [`stream`] - how intensity samples reach the state machine
//!
//! Both are small on purpose. A sensor driver only has to implement
//! [`Stream`] with `Item = IntensitySample` to feed the whole pipeline, and
//! tests replace it with an in-memory sequence.

pub mod stream;
pub mod time;

pub use stream::{IntensitySource, Stream};
pub use time::TimeSource;
