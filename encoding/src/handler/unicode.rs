//! The unicode-string family: LO, LT, PN, SH, ST, UC, UT (spec §4.3).
//!
//! Raw bytes go through the dataset's [`CharsetCollector`] before being
//! exposed as `&str`. `LT`, `ST`, `UT` are single-value VRs and are never
//! split on `\`; the others may carry several `\`-separated values. `PN`
//! additionally decomposes each value into alphabetic/ideographic/phonetic
//! groups via [`super::person_name`], but that is exposed through a
//! dedicated accessor rather than changing `len()`/`get_string()`.

use super::{ReadingHandler, WritingHandler};
use crate::error::{self, Result};
use rsdcm_core::charset::CharsetCollector;
use rsdcm_core::header::{Tag, VR};
use std::borrow::Cow;
use std::sync::Arc;

/// Whether `vr` splits its buffer on `\` into multiple values.
pub fn is_multi_valued(vr: VR) -> bool {
    !matches!(vr, VR::LT | VR::ST | VR::UT)
}

fn trim_trailing_space(bytes: &[u8]) -> &[u8] {
    let mut end = bytes.len();
    while end > 0 && (bytes[end - 1] == b' ' || bytes[end - 1] == 0) {
        end -= 1;
    }
    &bytes[..end]
}

#[derive(Debug)]
pub struct UnicodeReadingHandler {
    tag: Tag,
    vr: VR,
    raw: rsdcm_core::Memory,
    values: Vec<String>,
}

impl UnicodeReadingHandler {
    pub fn new(
        tag: Tag,
        vr: VR,
        raw: rsdcm_core::Memory,
        charsets_list: &[String],
        collector: &Arc<dyn CharsetCollector>,
    ) -> Self {
        let trimmed = trim_trailing_space(raw.as_slice());
        let values = if is_multi_valued(vr) {
            trimmed
                .split(|&b| b == b'\\')
                .map(|part| collector.decode(part, charsets_list).into_owned())
                .collect()
        } else if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![collector.decode(trimmed, charsets_list).into_owned()]
        };
        UnicodeReadingHandler { tag, vr, raw, values }
    }

    /// `PN` only: splits the value at `index` into its alphabetic,
    /// ideographic and phonetic groups.
    pub fn get_person_name_groups(&self, index: usize) -> Result<super::person_name::PersonNameGroups> {
        self.check_index(index)?;
        super::person_name::parse(self.tag, &self.values[index])
    }
}

impl ReadingHandler for UnicodeReadingHandler {
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

    fn raw_bytes(&self) -> &[u8] {
        self.raw.as_slice()
    }
}

#[derive(Debug)]
pub struct UnicodeWritingHandler {
    tag: Tag,
    vr: VR,
    values: Vec<String>,
    collector: Arc<dyn CharsetCollector>,
    charsets_list: Vec<String>,
}

impl UnicodeWritingHandler {
    pub fn new(tag: Tag, vr: VR, collector: Arc<dyn CharsetCollector>, charsets_list: Vec<String>) -> Self {
        UnicodeWritingHandler { tag, vr, values: Vec::new(), collector, charsets_list }
    }
}

impl WritingHandler for UnicodeWritingHandler {
    fn vr(&self) -> VR {
        self.vr
    }

    fn set_size(&mut self, count: usize) {
        if !is_multi_valued(self.vr) && count > 1 {
            return;
        }
        if self.values.len() < count {
            self.values.resize(count, String::new());
        }
    }

    fn set_string(&mut self, index: usize, value: &str) -> Result<()> {
        if !is_multi_valued(self.vr) && index > 0 {
            return error::InvalidValueSnafu {
                tag: self.tag,
                vr: self.vr,
                reason: "this VR holds a single value".to_string(),
            }
            .fail();
        }
        if self.values.len() <= index {
            self.values.resize(index + 1, String::new());
        }
        self.values[index] = value.to_string();
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>> {
        let encoded: Vec<Vec<u8>> =
            self.values.iter().map(|v| self.collector.encode(v, &self.charsets_list)).collect();
        let mut bytes = encoded.join(&b'\\');
        if bytes.len() % 2 != 0 {
            bytes.push(self.vr.padding_byte());
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsdcm_core::charset::IsoIr6;

    #[test]
    fn lo_splits_on_backslash() {
        let collector: Arc<dyn CharsetCollector> = Arc::new(IsoIr6);
        let h = UnicodeReadingHandler::new(
            Tag(0x0008, 0x0008),
            VR::LO,
            rsdcm_core::Memory::from_slice(b"A\\B"),
            &[],
            &collector,
        );
        assert_eq!(h.len(), 2);
        assert_eq!(h.get_string(0).unwrap(), "A");
        assert_eq!(h.get_string(1).unwrap(), "B");
    }

    #[test]
    fn st_never_splits() {
        let collector: Arc<dyn CharsetCollector> = Arc::new(IsoIr6);
        let h = UnicodeReadingHandler::new(
            Tag(0x0008, 0x0000),
            VR::ST,
            rsdcm_core::Memory::from_slice(b"line one\\line two"),
            &[],
            &collector,
        );
        assert_eq!(h.len(), 1);
        assert_eq!(h.get_string(0).unwrap(), "line one\\line two");
    }

    #[test]
    fn person_name_groups_are_reachable_through_the_handler() {
        let collector: Arc<dyn CharsetCollector> = Arc::new(IsoIr6);
        let h = UnicodeReadingHandler::new(
            Tag(0x0010, 0x0010),
            VR::PN,
            rsdcm_core::Memory::from_slice(b"Doe^John"),
            &[],
            &collector,
        );
        let g = h.get_person_name_groups(0).unwrap();
        assert_eq!(g.alphabetic, "Doe^John");
    }
}
