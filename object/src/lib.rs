#![deny(trivial_casts, trivial_numeric_casts, unstable_features)]
#![warn(missing_debug_implementations, unused_qualifications, unused_import_braces)]

//! The dataset tree, file-meta header, and file-level read/write entry
//! points (spec §4.4, §4.5).
//!
//! This is the layer that finally knows what a "DICOM file" is: a
//! `rsdcm-parser` element-header stream assembled into a
//! [`Dataset`](dataset::Dataset) tree, fronted by a `(0002,xxxx)`
//! [`FileMetaTable`](meta::FileMetaTable) that is always explicit-VR little
//! endian regardless of the body's transfer syntax.

pub mod dataset;
pub mod error;
pub mod file;
pub mod meta;

pub use dataset::{Dataset, Lut};
pub use error::{Error, Result};
pub use file::{read_file, read_stream, write_file, write_stream};
pub use meta::FileMetaTable;

/// Re-exports meant for `use rsdcm_object::prelude::*;`.
pub mod prelude {
    pub use crate::dataset::{Dataset, Lut};
    pub use crate::error::{Error, Result};
    pub use crate::file::{read_file, read_stream, write_file, write_stream};
    pub use crate::meta::FileMetaTable;
}
