#![deny(trivial_casts, trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(missing_debug_implementations, unused_qualifications, unused_import_braces)]

//! The transfer syntax table and the `CodecFactory` registry (spec §4.8,
//! §6).
//!
//! This crate deliberately knows nothing about JPEG, RLE or the native
//! pixel-data layout: it hosts the registry and the container-level
//! autodetection that only needs the transfer syntax table, while the
//! codecs themselves are implemented and registered by `rsdcm-pixeldata`,
//! which depends on this crate.

pub mod error;
pub mod factory;
pub mod transfer_syntax;

pub use error::{Error, Result};
pub use factory::{CodecFactory, ContainerKind, ImageCodecHandle};
pub use transfer_syntax::{CodecKind, TransferSyntax};

/// Re-exports meant for `use rsdcm_transfer_syntax_registry::prelude::*;`.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::factory::{CodecFactory, ContainerKind, ImageCodecHandle};
    pub use crate::transfer_syntax::{for_uid, CodecKind, TransferSyntax};
}
