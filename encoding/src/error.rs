//! Errors raised while building, reading, or writing through a value
//! handler (spec §4.3, "Failure semantics").

use rsdcm_core::header::{Tag, VR};
use snafu::Snafu;

/// Errors specific to the handler/buffer layer. [`rsdcm_core::Error`]
/// covers stream- and memory-level failures; this enum covers the
/// VR-interpretation failures layered on top of them.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// A lower-level stream or memory error.
    #[snafu(display("{}", source))]
    Core { source: rsdcm_core::Error },

    /// `getReadingHandler(SQ)` was called: sequences have no buffer, only
    /// child datasets.
    #[snafu(display("tag {} is a sequence; it has no buffer to read", tag))]
    InvalidHandlerForSequence { tag: Tag },

    /// A setter rejected a value outright (e.g. non-digit/dot UID
    /// characters, an AS unit other than D/W/M/Y).
    #[snafu(display("invalid value for tag {} ({}): {}", tag, vr, reason))]
    InvalidValue { tag: Tag, vr: VR, reason: String },

    /// A value exceeded the VR's maximum per-unit length on write.
    #[snafu(display(
        "value for tag {} ({}) is {} bytes, exceeding the {}-byte limit",
        tag,
        vr,
        len,
        max
    ))]
    ValueTooLong { tag: Tag, vr: VR, len: usize, max: usize },

    /// A read requested a type the VR cannot produce (e.g. `get_double` on
    /// a `UI`).
    #[snafu(display("tag {} ({}) cannot be read as the requested type", tag, vr))]
    ConversionError { tag: Tag, vr: VR },

    /// A second `WritingHandler` was requested for a `Buffer` that already
    /// has one in flight.
    #[snafu(display("tag {} already has a writing handler in progress", tag))]
    BufferBusy { tag: Tag },

    /// An index into a multi-valued tag was out of bounds.
    #[snafu(display("index {} out of range for tag {} ({} values)", index, tag, len))]
    IndexOutOfRange { tag: Tag, index: usize, len: usize },

    /// The buffer's bytes violate the VR's own format invariants.
    #[snafu(display("corrupted buffer for tag {} ({}): {}", tag, vr, reason))]
    CorruptedBuffer { tag: Tag, vr: VR, reason: String },
}

impl From<rsdcm_core::Error> for Error {
    fn from(source: rsdcm_core::Error) -> Self {
        Error::Core { source }
    }
}

/// The crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
