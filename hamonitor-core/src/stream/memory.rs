//! Memory-based streams for testing and replay
//!
//! Useful for:
//! - Unit testing the state machine with synthetic sequences
//! - Replaying recorded intensities
//! - Simulating a sensor without hardware

use super::{Stream, StreamError};
use crate::sample::IntensitySample;

/// Memory-based sample stream
///
/// Generic over its storage: a borrowed slice on targets without an
/// allocator, a `Vec` when the stream has to outlive its caller.
///
/// ## Example
///
/// ```rust
/// use hamonitor_core::stream::MemoryStream;
/// use hamonitor_core::{IntensitySample, Stream};
///
/// let samples = [IntensitySample::new(5, 0), IntensitySample::new(7, 33)];
/// let mut stream = MemoryStream::new(&samples[..]);
///
/// assert_eq!(stream.poll_next().ok(), Some(samples[0]));
/// assert_eq!(stream.size_hint(), (1, Some(1)));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStream<B> {
    /// Samples to stream
    samples: B,
    /// Current position
    position: usize,
}

impl<B: AsRef<[IntensitySample]>> MemoryStream<B> {
    /// Create a stream over `samples`
    pub fn new(samples: B) -> Self {
        Self {
            samples,
            position: 0,
        }
    }

    /// Rewind to the first sample
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Samples handed out so far
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether every sample has been handed out
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.samples.as_ref().len()
    }
}

impl<B: AsRef<[IntensitySample]>> Stream for MemoryStream<B> {
    type Item = IntensitySample;
    type Error = StreamError<()>;

    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error> {
        let sample = self
            .samples
            .as_ref()
            .get(self.position)
            .copied()
            .ok_or(nb::Error::Other(StreamError::EndOfStream))?;

        self.position += 1;
        Ok(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.samples.as_ref().len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}
