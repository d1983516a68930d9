//! Errors raised while decoding or encoding the DICOM element stream
//! (spec §4.5, §7).

use rsdcm_core::header::Tag;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// A lower-level stream or memory error.
    #[snafu(display("{}", source))]
    Core { source: rsdcm_core::Error },

    /// A container invariant was violated: an undefined length on a
    /// non-SQ, non-pixel-data element, a missing delimiter, or a truncated
    /// header.
    #[snafu(display("corrupted file at tag {}: {}", tag, reason))]
    CorruptedFile { tag: Tag, reason: String },

    /// The two-character VR read from the stream is not one this crate
    /// recognizes.
    #[snafu(display("unrecognized VR bytes at tag {}", tag))]
    UnknownVr { tag: Tag },
}

impl From<rsdcm_core::Error> for Error {
    fn from(source: rsdcm_core::Error) -> Self {
        Error::Core { source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
