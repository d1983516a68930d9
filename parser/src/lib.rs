#![deny(trivial_casts, trivial_numeric_casts, unstable_features)]
#![warn(missing_debug_implementations, unused_qualifications, unused_import_braces)]

//! The DICOM stream codec's header primitives (spec §4.5).
//!
//! `rsdcm-parser` knows how to read and write one element's
//! `{tag, vr, length}` triple under a given [`TransferSyntax`], including
//! the implicit/explicit VR and long/short header distinctions and the
//! bare pseudo-tag form used to frame sequence items. It does not know what
//! a `Dataset` is — the stateful recursion that turns a flat header stream
//! into a tree of tags and nested items (tracking undefined-length SQ
//! content, item delimiters, and encapsulated pixel-data fragments) is
//! built on top of these primitives by `rsdcm-object`, which owns the
//! `Dataset` type this crate cannot depend on.
//!
//! [`TransferSyntax`]: rsdcm_transfer_syntax_registry::TransferSyntax

pub mod error;
pub mod header_codec;

pub use error::{Error, Result};
pub use header_codec::{read_element_header, read_tag, write_element_header, write_item_header, ElementHeader};

/// Re-exports meant for `use rsdcm_parser::prelude::*;`.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::header_codec::{
        read_element_header, read_tag, write_element_header, write_item_header, ElementHeader,
    };
}
