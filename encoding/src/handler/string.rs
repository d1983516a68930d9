//! The narrow-byte string family: AE, CS, DS, IS, UI, UR (spec §4.3).
//!
//! Values are separated by `\`; trailing `0x20` is ignored on read and
//! re-added (to the last component only) for even-length padding on write.
//! `UI` pads with `0x00` instead and additionally normalizes its components
//! on both read and write (spec §8, property 4).

use super::{ReadingHandler, WritingHandler};
use crate::error::{self, Result};
use rsdcm_core::header::{Tag, VR};
use std::borrow::Cow;

/// The maximum number of characters a single value of `vr` may occupy on
/// write, per the standard's VR definitions. `0` means unbounded.
pub fn max_unit_size(vr: VR) -> usize {
    match vr {
        VR::AE => 16,
        VR::CS => 16,
        VR::DS => 16,
        VR::IS => 12,
        VR::UI => 64,
        VR::UR => 0,
        _ => 0,
    }
}

/// The padding byte this VR uses to round an odd-length value up to even.
pub fn padding_byte(vr: VR) -> u8 {
    vr.padding_byte()
}

fn trim_trailing_padding(bytes: &[u8], padding: u8) -> &[u8] {
    let mut end = bytes.len();
    while end > 0 && bytes[end - 1] == padding {
        end -= 1;
    }
    &bytes[..end]
}

/// Splits a narrow-byte buffer on `\` into raw (not yet UID-normalized)
/// components, trimming the shared trailing padding first.
fn split_components(raw: &[u8], vr: VR) -> Vec<String> {
    let trimmed = trim_trailing_padding(raw, padding_byte(vr));
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split(|&b| b == b'\\')
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect()
}

/// Collapses redundant leading zeros in a single dot-separated UID
/// component, keeping a lone `"0"` rather than an empty string.
fn normalize_uid_component(component: &str) -> String {
    let trimmed = component.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Normalizes a UID value per spec §4.3 / §8 property 4:
/// - every character must be a digit or `.`
/// - each component has its redundant leading zeros collapsed
/// - an empty trailing component (a literal trailing dot) becomes `0`
pub fn normalize_uid(tag: Tag, value: &str) -> Result<String> {
    if value.is_empty() {
        return Ok(String::new());
    }
    if !value.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return error::InvalidValueSnafu {
            tag,
            vr: VR::UI,
            reason: format!("'{value}' contains characters other than digits and '.'"),
        }
        .fail();
    }
    let parts: Vec<&str> = value.split('.').collect();
    let normalized: Vec<String> = parts
        .iter()
        .map(|p| if p.is_empty() { "0".to_string() } else { normalize_uid_component(p) })
        .collect();
    Ok(normalized.join("."))
}

/// A reading handler for the narrow-byte string family.
#[derive(Debug)]
pub struct StringReadingHandler {
    tag: Tag,
    vr: VR,
    raw: rsdcm_core::Memory,
    values: Vec<String>,
}

impl StringReadingHandler {
    /// Builds a handler over already-materialized bytes, splitting and (for
    /// `UI`) normalizing eagerly so every subsequent read is lock-free and
    /// infallible at the split stage.
    pub fn new(tag: Tag, vr: VR, raw: rsdcm_core::Memory) -> Result<Self> {
        let mut values = split_components(raw.as_slice(), vr);
        if vr == VR::UI {
            for v in values.iter_mut() {
                *v = normalize_uid(tag, v)?;
            }
        } else {
            for v in values.iter_mut() {
                *v = v.trim_end_matches(' ').to_string();
            }
        }
        Ok(StringReadingHandler { tag, vr, raw, values })
    }
}

impl ReadingHandler for StringReadingHandler {
    fn vr(&self) -> VR {
        self.vr
    }

    fn tag(&self) -> Tag {
        self.tag
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn get_string(&self, index: usize) -> Result<Cow<'_, str>> {
        self.check_index(index)?;
        Ok(Cow::Borrowed(&self.values[index]))
    }

    fn get_int(&self, index: usize) -> Result<i64> {
        self.check_index(index)?;
        if !matches!(self.vr, VR::DS | VR::IS) {
            return error::ConversionSnafu { tag: self.tag, vr: self.vr }.fail();
        }
        self.values[index].trim().parse::<i64>().map_err(|_| {
            error::Error::ConversionError { tag: self.tag, vr: self.vr }
        })
    }

    fn get_double(&self, index: usize) -> Result<f64> {
        self.check_index(index)?;
        if !matches!(self.vr, VR::DS | VR::IS) {
            return error::ConversionSnafu { tag: self.tag, vr: self.vr }.fail();
        }
        self.values[index].trim().parse::<f64>().map_err(|_| {
            error::Error::ConversionError { tag: self.tag, vr: self.vr }
        })
    }

    fn raw_bytes(&self) -> &[u8] {
        self.raw.as_slice()
    }
}

/// A writing handler for the narrow-byte string family.
#[derive(Debug)]
pub struct StringWritingHandler {
    tag: Tag,
    vr: VR,
    values: Vec<String>,
}

impl StringWritingHandler {
    pub fn new(tag: Tag, vr: VR) -> Self {
        StringWritingHandler { tag, vr, values: Vec::new() }
    }
}

impl WritingHandler for StringWritingHandler {
    fn vr(&self) -> VR {
        self.vr
    }

    fn set_size(&mut self, count: usize) {
        if self.values.len() < count {
            self.values.resize(count, String::new());
        }
    }

    fn set_string(&mut self, index: usize, value: &str) -> Result<()> {
        if self.values.len() <= index {
            self.values.resize(index + 1, String::new());
        }
        let stored = if self.vr == VR::UI { normalize_uid(self.tag, value)? } else { value.to_string() };
        let max = max_unit_size(self.vr);
        if max > 0 && stored.len() > max {
            return error::ValueTooLongSnafu { tag: self.tag, vr: self.vr, len: stored.len(), max }.fail();
        }
        self.values[index] = stored;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let max = max_unit_size(self.vr);
        for v in &self.values {
            if max > 0 && v.len() > max {
                return error::ValueTooLongSnafu { tag: self.tag, vr: self.vr, len: v.len(), max }.fail();
            }
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>> {
        self.validate()?;
        let joined = self.values.join("\\");
        let mut bytes = joined.into_bytes();
        if bytes.len() % 2 != 0 {
            bytes.push(padding_byte(self.vr));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_normalization_is_idempotent() {
        let tag = Tag(0x0002, 0x0010);
        let once = normalize_uid(tag, "001.23.03").unwrap();
        assert_eq!(once, "1.23.3");
        let twice = normalize_uid(tag, &once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn uid_trailing_dot_becomes_dot_zero() {
        let tag = Tag(0x0002, 0x0010);
        assert_eq!(normalize_uid(tag, "001.23.3.").unwrap(), "1.23.3.0");
    }

    #[test]
    fn uid_rejects_non_digit_non_dot() {
        let tag = Tag(0x0002, 0x0010);
        assert!(normalize_uid(tag, "abc").is_err());
    }

    #[test]
    fn string_handler_trims_trailing_space_padding() {
        let h = StringReadingHandler::new(Tag(0x0008, 0x0060), VR::CS, rsdcm_core::Memory::from_slice(b"CT  ")).unwrap();
        assert_eq!(h.get_string(0).unwrap(), "CT");
    }

    #[test]
    fn ds_handler_parses_numeric_getters() {
        let h = StringReadingHandler::new(Tag(0x0028, 0x1052), VR::DS, rsdcm_core::Memory::from_slice(b"-3.5")).unwrap();
        assert_eq!(h.get_double(0).unwrap(), -3.5);
    }

    #[test]
    fn writing_handler_pads_to_even_length() {
        let mut w = StringWritingHandler::new(Tag(0x0008, 0x0060), VR::CS);
        w.set_string(0, "CT").unwrap();
        let bytes = Box::new(w).finish().unwrap();
        assert_eq!(bytes.len() % 2, 0);
    }

    #[test]
    fn writing_handler_rejects_too_long_as() {
        let mut w = StringWritingHandler::new(Tag(0x0010, 0x1010), VR::IS);
        let long_value = "1".repeat(20);
        assert!(w.set_string(0, &long_value).is_err());
    }
}
