#![deny(trivial_casts, trivial_numeric_casts, unstable_features)]
#![warn(missing_debug_implementations, unused_qualifications, unused_import_braces)]

//! Value handlers and the lazily-materialized tag buffer (spec §4.2, §4.3).
//!
//! This crate sits directly on `rsdcm-core`: it turns a tag's raw bytes
//! (held by a [`buffer::Buffer`]) into typed values through one of the five
//! VR-family [`handler`] pairs, and back again on write.

pub mod adapters;
pub mod buffer;
pub mod error;
pub mod handler;

pub use buffer::Buffer;
pub use error::{Error, Result};

/// Re-exports meant for `use rsdcm_encoding::prelude::*;`.
pub mod prelude {
    pub use crate::buffer::Buffer;
    pub use crate::error::{Error, Result};
    pub use crate::handler::{ReadingHandler, WritingHandler};
}
