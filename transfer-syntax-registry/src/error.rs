//! Errors raised while autodetecting a container format or selecting a
//! codec (spec §7).

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// Autodetect exhausted every registered stream codec.
    #[snafu(display("no registered stream codec recognized this source"))]
    WrongFormat,

    /// The transfer syntax UID is not in the table, or names a codec kind
    /// with no `ImageCodec` registered for it.
    #[snafu(display("no codec registered for transfer syntax '{}'", uid))]
    WrongTransferSyntax { uid: String },

    /// A decoded (or about-to-be-decoded) image would exceed the
    /// process-wide configured maximum dimensions.
    #[snafu(display(
        "image {}x{} exceeds the configured maximum of {}x{}",
        width,
        height,
        max_width,
        max_height
    ))]
    ImageTooBig { width: u32, height: u32, max_width: u32, max_height: u32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
