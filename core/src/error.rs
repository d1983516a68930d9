//! The error taxonomy shared by every crate built on top of `rsdcm-core`.
//!
//! Each layer above this one (encoding, parser, object, pixeldata) defines
//! its own `Snafu` enum for concerns specific to that layer, following the
//! same pattern used here: one variant per failure named in the
//! specification, a `Backtrace` field on every variant, and `snafu::Whatever`
//! avoided in favor of explicit context selectors.

use crate::header::Tag;
use snafu::Snafu;

/// Errors that can occur while materializing or interpreting the bytes
/// behind a single tag's value, independent of which VR is involved.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The stream ended before the requested number of bytes could be read.
    #[snafu(display("stream ended before {} bytes could be read (got {})", expected, got))]
    StreamEof { expected: usize, got: usize },

    /// A read was attempted on a [`StreamView`](crate::stream::StreamView)
    /// after [`StreamView::terminate`](crate::stream::StreamView::terminate)
    /// was called.
    #[snafu(display("stream was terminated"))]
    StreamClosed,

    /// A forward-only stream received a request it cannot satisfy (e.g. a
    /// seek to an earlier position).
    #[snafu(display("stream does not support the requested seek"))]
    StreamNotSeekable,

    /// Content at the requested tag violates a VR-level invariant.
    #[snafu(display("corrupted buffer for tag {}: {}", tag, reason))]
    CorruptedBuffer { tag: Tag, reason: String },

    /// A value could not be coerced to the type the caller asked for.
    #[snafu(display("cannot convert value of tag {} to the requested type", tag))]
    ConversionError { tag: Tag },

    /// An index into a multi-valued tag was out of range.
    #[snafu(display("index {} out of range (tag {} has {} values)", index, tag, len))]
    IndexOutOfRange { tag: Tag, index: usize, len: usize },
}

/// The crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
