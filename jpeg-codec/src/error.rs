//! JPEG-specific error taxonomy (spec §4.6, §7).

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// A lower-level stream error (short read, terminated view).
    #[snafu(display("{}", source))]
    Core { source: rsdcm_core::Error },

    /// SOF marker outside the supported profiles (spec §4.6: baseline,
    /// extended, lossless + first-order predictor only).
    #[snafu(display("unsupported JPEG feature: {what}"))]
    JpegUnsupported { what: String },

    /// Malformed Huffman code, amplitude overrun, missing SOF before SOS,
    /// or any other structural violation of the entropy stream.
    #[snafu(display("corrupted JPEG stream: {reason}"))]
    CorruptedFile { reason: String },
}

impl From<rsdcm_core::Error> for Error {
    fn from(source: rsdcm_core::Error) -> Self {
        Error::Core { source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
