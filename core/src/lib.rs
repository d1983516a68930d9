#![deny(trivial_casts, trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(missing_debug_implementations, unused_qualifications, unused_import_braces)]

//! Core in-memory object model for DICOM compliant systems.
//!
//! This crate provides the building blocks shared by every layer above it:
//! the DICOM attribute [`Tag`] and [`VR`] types, an even-length [`Length`],
//! a reference-counted, copy-on-write [`Memory`] block, and the [`StreamView`]
//! abstraction used to read those blocks lazily from an external source.
//!
//! Higher layers (`rsdcm-encoding`, `rsdcm-parser`, `rsdcm-object`,
//! `rsdcm-pixeldata`) build value handlers, the dataset tree and the codec
//! pipeline on top of what is defined here.

pub mod charset;
pub mod error;
pub mod header;
pub mod memory;
pub mod ops;
pub mod stream;

pub use error::{Error, Result};
pub use header::{Length, Tag, VR};
pub use memory::Memory;
pub use stream::{BitReader, Endianness, StreamView};

/// Re-exports meant for `use rsdcm_core::prelude::*;`.
pub mod prelude {
    pub use crate::charset::{CharsetCollector, IsoIr6};
    pub use crate::error::{Error, Result};
    pub use crate::header::{Length, Tag, VR};
    pub use crate::memory::Memory;
    pub use crate::stream::{BitReader, Endianness, StreamView};
}
