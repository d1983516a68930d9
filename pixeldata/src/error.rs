//! The pixel-data/image error taxonomy (spec §7), layered on top of the
//! lower crates' error enums the same way `rsdcm-object`'s does.

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

    /// A `Dataset`-level error (missing tag, wrong shape, ...).
    #[snafu(display("{}", source))]
    Object { source: rsdcm_object::Error },

    /// A transfer-syntax registry error, including `ImageTooBig` and
    /// `WrongTransferSyntax`.
    #[snafu(display("{}", source))]
    Registry { source: rsdcm_transfer_syntax_registry::Error },

    /// `setImage` was asked to write a frame whose shape (dimensions,
    /// samples per pixel, bits allocated, color space) does not match the
    /// dataset's existing image attributes.
    #[snafu(display("image shape does not match the dataset's recorded attributes"))]
    DifferentFormat,

    /// `setImage` was called out of order: `frame` must equal the dataset's
    /// current frame count (append-only insertion, spec §4.7).
    #[snafu(display("setImage called with frame {frame}, but the dataset has {frame_count} frames"))]
    WrongFrame { frame: u32, frame_count: u32 },

    /// `getImage` was asked for a frame index the pixel data does not have
    /// (`frameNumber >= numberOfFrames`).
    #[snafu(display("frame {frame} is out of range ({frame_count} frames present)"))]
    FrameOutOfRange { frame: u32, frame_count: u32 },

    /// A JPEG stream used a marker, mode or parameter combination this
    /// codec does not implement (e.g. progressive/hierarchical SOF, an
    /// arithmetic-coded scan, more than 4 components).
    #[snafu(display("unsupported JPEG feature: {what}"))]
    JpegUnsupported { what: String },

    /// A JPEG bitstream violated a structural invariant this codec relies
    /// on (bad marker sequence, Huffman code not found, truncated scan).
    #[snafu(display("corrupted JPEG stream: {reason}"))]
    CorruptedJpeg { reason: String },

    /// `(tag, group)` does not carry the image attributes a codec needs
    /// (e.g. `(0028,0100)` BitsAllocated missing).
    #[snafu(display("missing image attribute {}", tag))]
    MissingAttribute { tag: Tag },

    /// An image attribute combination is structurally invalid (e.g.
    /// samples-per-pixel disagreeing with the photometric interpretation).
    #[snafu(display("invalid image attributes: {reason}"))]
    InvalidValue { reason: String },
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

impl From<rsdcm_object::Error> for Error {
    fn from(source: rsdcm_object::Error) -> Self {
        Error::Object { source }
    }
}

impl From<rsdcm_transfer_syntax_registry::Error> for Error {
    fn from(source: rsdcm_transfer_syntax_registry::Error) -> Self {
        Error::Registry { source }
    }
}

impl From<rsdcm_jpeg_codec::Error> for Error {
    fn from(source: rsdcm_jpeg_codec::Error) -> Self {
        match source {
            rsdcm_jpeg_codec::Error::Core { source } => Error::Core { source },
            rsdcm_jpeg_codec::Error::JpegUnsupported { what } => Error::JpegUnsupported { what },
            rsdcm_jpeg_codec::Error::CorruptedFile { reason } => Error::CorruptedJpeg { reason },
            other => Error::CorruptedJpeg { reason: other.to_string() },
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
