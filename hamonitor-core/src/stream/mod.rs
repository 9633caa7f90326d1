//! Intensity sample sources
//!
//! ## Module Organization
//!
//! - Core error type (this file)
//! - `memory` - in-memory sequences for tests and replay
//! - `line` - one sample per text line from any reader (requires `std`)
//! - `adapters` - stream transformers (windowed averaging)
//!
//! A live sensor is just another [`Stream`] implementation; the pipeline does
//! not care which of these it is pulling from.

use core::fmt;

pub mod adapters;
pub mod memory;

#[cfg(feature = "std")]
pub mod line;

pub use adapters::WindowedAverage;
pub use memory::MemoryStream;

#[cfg(feature = "std")]
pub use line::{LineStream, LineStreamStats};

pub use crate::traits::{IntensitySource, Stream};

/// Errors that can occur while pulling samples
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError<E> {
    /// Transport-level error (I/O, driver)
    Transport(E),
    /// Data format error
    Format(&'static str),
    /// End of stream reached
    EndOfStream,
}

impl<E> StreamError<E> {
    /// Whether the stream has nothing more to give
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

impl<E: fmt::Display> fmt::Display for StreamError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::Format(msg) => write!(f, "Format error: {}", msg),
            Self::EndOfStream => write!(f, "End of stream"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug + fmt::Display> std::error::Error for StreamError<E> {}
