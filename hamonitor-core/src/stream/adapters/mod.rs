//! Stream adapters
//!
//! Adapters wrap another [`Stream`](crate::Stream) and change what it yields
//! without the consumer knowing. The pipeline treats an adapted stream like
//! any other source.

pub mod windowed;

pub use windowed::{WindowStats, WindowedAverage};
