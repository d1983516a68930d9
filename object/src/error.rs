//! The `Dataset`-level error taxonomy (spec §7).
//!
//! Lower layers (`rsdcm-core`, `rsdcm-encoding`, `rsdcm-parser`) each define
//! their own concern-scoped error enum; this one adds the failures that
//! only make sense once there is a tag tree to look things up in, and wraps
//! the layers below it as `source` variants so a caller sees the original
//! cause through `std::error::Error::source`.

use rsdcm_core::header::Tag;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// A lower-level stream or memory error.
    #[snafu(display("{}", source))]
    Core { source: rsdcm_core::Error },

    /// A value-handler or buffer-level error.
    #[snafu(display("{}", source))]
    Encoding { source: rsdcm_encoding::Error },

    /// A stream-codec header error.
    #[snafu(display("{}", source))]
    Parser { source: rsdcm_parser::Error },

    /// A transfer-syntax registry error.
    #[snafu(display("{}", source))]
    Registry { source: rsdcm_transfer_syntax_registry::Error },

    /// The requested element's group is not present in the dataset at all.
    #[snafu(display("group of tag {} is missing", tag))]
    MissingGroup { tag: Tag },

    /// The requested element's group is present but the element itself is
    /// not.
    #[snafu(display("tag {} is missing", tag))]
    MissingTag { tag: Tag },

    /// The dataset does not carry a tag at `(group, element)` with VR
    /// `SQ`, but a sequence operation was attempted on it.
    #[snafu(display("tag {} is not a sequence", tag))]
    NotASequence { tag: Tag },

    /// `tag` holds a sequence, but a buffer-level operation was attempted
    /// on it.
    #[snafu(display("tag {} is a sequence, not a value", tag))]
    IsSequence { tag: Tag },

    /// Autodetect could not recognize the container (neither preamble nor
    /// bare-element form matched).
    #[snafu(display("the input does not look like a DICOM stream"))]
    WrongFormat,

    /// The transfer syntax named by `(0002,0010)` (or passed explicitly)
    /// is not recognized or has no codec registered for it.
    #[snafu(display("no codec for transfer syntax '{}'", uid))]
    WrongTransferSyntax { uid: String },

    /// A container-level invariant was violated while parsing the element
    /// stream (e.g. undefined length on a non-SQ, non-pixel-data element,
    /// or a missing delimiter).
    #[snafu(display("corrupted file at tag {}: {}", tag, reason))]
    CorruptedFile { tag: Tag, reason: String },

    /// Opening, reading or writing the underlying file failed.
    #[snafu(display("I/O error: {}", source))]
    Io { source: std::io::Error },
}

impl From<rsdcm_core::Error> for Error {
    fn from(source: rsdcm_core::Error) -> Self {
        Error::Core { source }
    }
}

impl From<rsdcm_encoding::Error> for Error {
    fn from(source: rsdcm_encoding::Error) -> Self {
        Error::Encoding { source }
    }
}

impl From<rsdcm_parser::Error> for Error {
    fn from(source: rsdcm_parser::Error) -> Self {
        Error::Parser { source }
    }
}

impl From<rsdcm_transfer_syntax_registry::Error> for Error {
    fn from(source: rsdcm_transfer_syntax_registry::Error) -> Self {
        Error::Registry { source }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
