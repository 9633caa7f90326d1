//! Stream Processing Traits
//!
//! Samples are pulled, not pushed. The design follows the `nb` crate:
//!
//! - **Pull-based**: the pipeline decides when to ask for the next frame
//! - **Non-blocking**: `WouldBlock` means "no frame yet, ask again"
//! - **No hidden allocation**: sources own whatever buffering they need
//!
//! ## Common Pattern
//!
//! ```rust
//! use hamonitor_core::stream::{MemoryStream, StreamError};
//! use hamonitor_core::{IntensitySample, Stream};
//!
//! let mut stream = MemoryStream::new(vec![
//!     IntensitySample::new(10, 0),
//!     IntensitySample::new(20, 33),
//! ]);
//!
//! let mut total = 0;
//! loop {
//!     match stream.poll_next() {
//!         Ok(sample) => total += sample.value,
//!         Err(nb::Error::WouldBlock) => continue,
//!         Err(nb::Error::Other(StreamError::EndOfStream)) => break,
//!         Err(nb::Error::Other(e)) => panic!("{:?}", e),
//!     }
//! }
//! assert_eq!(total, 30);
//! ```

use crate::sample::IntensitySample;

/// Core stream trait for sample sources
///
/// ## Contract
///
/// - `Ok(item)`: next item available
/// - `Err(nb::Error::WouldBlock)`: nothing yet, poll again later
/// - `Err(nb::Error::Other(e))`: stream error
///
/// Sensor streams are infinite and cannot be rewound. After an
/// `EndOfStream` error, further polls keep returning it.
pub trait Stream {
    /// Type of items produced by the stream
    type Item;

    /// Type of errors that can occur
    type Error;

    /// Attempt to pull the next item from the stream
    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error>;

    /// Bounds on remaining items, like `Iterator::size_hint()`
    ///
    /// Default is `(0, None)`: unknown, which is what a live sensor reports.
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}

/// A stream of intensity samples
///
/// Blanket-implemented for every [`Stream`] producing [`IntensitySample`],
/// so drivers only implement `Stream`.
pub trait IntensitySource: Stream<Item = IntensitySample> {}

impl<S> IntensitySource for S where S: Stream<Item = IntensitySample> + ?Sized {}

impl<S: Stream + ?Sized> Stream for &mut S {
    type Item = S::Item;
    type Error = S::Error;

    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error> {
        (**self).poll_next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (**self).size_hint()
    }
}

#[cfg(feature = "std")]
impl<S: Stream + ?Sized> Stream for std::boxed::Box<S> {
    type Item = S::Item;
    type Error = S::Error;

    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error> {
        (**self).poll_next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (**self).size_hint()
    }
}
