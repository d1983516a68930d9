//! One [`ReadingHandler`]/[`WritingHandler`] pair per DICOM value
//! representation family (spec §4.3).
//!
//! Rather than an inheritance tower, each family is a small struct sharing a
//! few free functions (padding, separator handling); the two traits below
//! give every VR a uniform surface, with family-inappropriate operations
//! defaulting to [`Error::ConversionError`]. This mirrors Imebra's
//! `dataHandler` base class, whose virtual `getString`/`getSignedLong`/
//! `getDouble` accessors default to throwing in the base and are overridden
//! per family (`original_source/library/implementation/dataHandler*Impl.h`).

pub mod datetime;
pub mod numeric;
pub mod person_name;
pub mod string;
pub mod unicode;

use crate::error::{self, Result};
use rsdcm_core::header::{Tag, VR};
use std::borrow::Cow;
use std::fmt::Debug;

/// An immutable, already-materialized view over one tag's value, typed by
/// VR. Constructing a `ReadingHandler` never blocks past the initial
/// materialization the owning `Buffer` performs; once built, reads never
/// lock (spec §4.2, "Concurrency").
pub trait ReadingHandler: Debug + Send + Sync {
    /// The VR this handler was constructed for.
    fn vr(&self) -> VR;

    /// The tag this handler was constructed for (used only for error
    /// messages).
    fn tag(&self) -> Tag;

    /// The number of logical values in the buffer (e.g. the number of
    /// `\`-separated components for a string-family VR).
    fn len(&self) -> usize;

    /// Whether the handler holds zero values.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the value at `index` as a string.
    fn get_string(&self, index: usize) -> Result<Cow<'_, str>> {
        let _ = index;
        error::ConversionSnafu { tag: self.tag(), vr: self.vr() }.fail()
    }

    /// Reads the value at `index` as a 64-bit integer.
    fn get_int(&self, index: usize) -> Result<i64> {
        let _ = index;
        error::ConversionSnafu { tag: self.tag(), vr: self.vr() }.fail()
    }

    /// Reads the value at `index` as a double.
    fn get_double(&self, index: usize) -> Result<f64> {
        let _ = index;
        error::ConversionSnafu { tag: self.tag(), vr: self.vr() }.fail()
    }

    /// The raw bytes backing this handler, unparsed.
    fn raw_bytes(&self) -> &[u8];

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.len() {
            error::IndexOutOfRangeSnafu { tag: self.tag(), index, len: self.len() }.fail()
        } else {
            Ok(())
        }
    }
}

/// A single-owner, accumulating view used to build a tag's value before it
/// is committed back to the `Buffer` (spec §4.3, "WritingHandler
/// lifecycle").
///
/// The *accumulating* → *published* transition is explicit: call
/// [`WritingHandler::finish`] to validate and serialize. Letting the
/// handler drop without calling `finish` discards the accumulated content
/// rather than silently publishing a possibly-invalid value — a fallible
/// operation has no business running from a destructor, and the spec
/// requires every failure to reach the caller (§4.3).
pub trait WritingHandler: Debug {
    /// The VR this handler was constructed for.
    fn vr(&self) -> VR;

    /// Reserves room for `count` logical values, as a hint.
    fn set_size(&mut self, count: usize);

    /// Sets the value at `index`, growing the handler if necessary.
    fn set_string(&mut self, index: usize, value: &str) -> Result<()>;

    /// Sets the value at `index` from an integer.
    fn set_int(&mut self, index: usize, value: i64) -> Result<()> {
        self.set_string(index, &value.to_string())
    }

    /// Sets the value at `index` from a double.
    fn set_double(&mut self, index: usize, value: f64) -> Result<()> {
        self.set_string(index, &value.to_string())
    }

    /// Validates the accumulated content without serializing it. Exposed so
    /// callers can check for e.g. `ValueTooLong` before committing.
    fn validate(&self) -> Result<()>;

    /// Serializes the accumulated content to its on-disk byte form,
    /// including VR-appropriate even-length padding.
    fn finish(self: Box<Self>) -> Result<Vec<u8>>;
}
