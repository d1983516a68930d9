//! The numeric family: FL, FD, SS, US, SL, UL, OB, OW, OL, OD, OF, AT
//! (spec §4.3).
//!
//! Every variant is backed by a typed `Vec`; [`NumericReadingHandler`]
//! exposes both the typed slice (for the image codecs' interleaved
//! copy-in/copy-out) and the documented cross-type coercions (`get_int`,
//! `get_double`) that the rest of the dataset API uses uniformly.
//!
//! By the time a buffer reaches this handler its bytes are already in
//! host-native order: [`Buffer`](crate::buffer::Buffer) materialization
//! performs the endian swap described in spec §4.2, so parsing here always
//! uses `from_ne_bytes`/`to_ne_bytes`.

use super::{ReadingHandler, WritingHandler};
use crate::error::{self, Result};
use rsdcm_core::header::{Tag, VR};
use std::borrow::Cow;

/// The typed backing storage for one numeric-family buffer.
#[derive(Debug, Clone)]
pub enum NumericStorage {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    /// `AT`: pairs of `(group, element)`, one per value.
    Tag(Vec<(u16, u16)>),
}

impl NumericStorage {
    pub fn len(&self) -> usize {
        match self {
            NumericStorage::I8(v) => v.len(),
            NumericStorage::U8(v) => v.len(),
            NumericStorage::I16(v) => v.len(),
            NumericStorage::U16(v) => v.len(),
            NumericStorage::I32(v) => v.len(),
            NumericStorage::U32(v) => v.len(),
            NumericStorage::F32(v) => v.len(),
            NumericStorage::F64(v) => v.len(),
            NumericStorage::Tag(v) => v.len(),
        }
    }

    /// A saturating/truncating coercion to `i64`, documented per spec
    /// §4.3 ("Numeric-family... cross-type coercions... with documented
    /// saturation/truncation").
    pub fn as_i64(&self, index: usize) -> i64 {
        match self {
            NumericStorage::I8(v) => v[index] as i64,
            NumericStorage::U8(v) => v[index] as i64,
            NumericStorage::I16(v) => v[index] as i64,
            NumericStorage::U16(v) => v[index] as i64,
            NumericStorage::I32(v) => v[index] as i64,
            NumericStorage::U32(v) => v[index] as i64,
            NumericStorage::F32(v) => v[index] as i64,
            NumericStorage::F64(v) => v[index] as i64,
            NumericStorage::Tag(v) => ((v[index].0 as i64) << 16) | v[index].1 as i64,
        }
    }

    pub fn as_f64(&self, index: usize) -> f64 {
        match self {
            NumericStorage::I8(v) => v[index] as f64,
            NumericStorage::U8(v) => v[index] as f64,
            NumericStorage::I16(v) => v[index] as f64,
            NumericStorage::U16(v) => v[index] as f64,
            NumericStorage::I32(v) => v[index] as f64,
            NumericStorage::U32(v) => v[index] as f64,
            NumericStorage::F32(v) => v[index] as f64,
            NumericStorage::F64(v) => v[index],
            NumericStorage::Tag(v) => (((v[index].0 as u32) << 16) | v[index].1 as u32) as f64,
        }
    }

    fn element_size(vr: VR) -> usize {
        match vr {
            VR::FL | VR::OF | VR::SL | VR::OL | VR::UL => 4,
            VR::FD | VR::OD => 8,
            VR::SS | VR::US | VR::OW => 2,
            VR::OB => 1,
            VR::AT => 4,
            _ => 0,
        }
    }

    fn parse(vr: VR, bytes: &[u8]) -> Self {
        match vr {
            VR::OB => NumericStorage::U8(bytes.to_vec()),
            VR::OW => NumericStorage::U16(
                bytes.chunks_exact(2).map(|c| u16::from_ne_bytes([c[0], c[1]])).collect(),
            ),
            VR::SS => NumericStorage::I16(
                bytes.chunks_exact(2).map(|c| i16::from_ne_bytes([c[0], c[1]])).collect(),
            ),
            VR::US => NumericStorage::U16(
                bytes.chunks_exact(2).map(|c| u16::from_ne_bytes([c[0], c[1]])).collect(),
            ),
            VR::SL => NumericStorage::I32(
                bytes.chunks_exact(4).map(|c| i32::from_ne_bytes(c.try_into().unwrap())).collect(),
            ),
            VR::UL => NumericStorage::U32(
                bytes.chunks_exact(4).map(|c| u32::from_ne_bytes(c.try_into().unwrap())).collect(),
            ),
            VR::OL => NumericStorage::I32(
                bytes.chunks_exact(4).map(|c| i32::from_ne_bytes(c.try_into().unwrap())).collect(),
            ),
            VR::FL | VR::OF => NumericStorage::F32(
                bytes.chunks_exact(4).map(|c| f32::from_ne_bytes(c.try_into().unwrap())).collect(),
            ),
            VR::FD | VR::OD => NumericStorage::F64(
                bytes.chunks_exact(8).map(|c| f64::from_ne_bytes(c.try_into().unwrap())).collect(),
            ),
            VR::AT => NumericStorage::Tag(
                bytes
                    .chunks_exact(4)
                    .map(|c| {
                        let g = u16::from_ne_bytes([c[0], c[1]]);
                        let e = u16::from_ne_bytes([c[2], c[3]]);
                        (g, e)
                    })
                    .collect(),
            ),
            _ => NumericStorage::U8(bytes.to_vec()),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        match self {
            NumericStorage::I8(v) => v.iter().map(|x| *x as u8).collect(),
            NumericStorage::U8(v) => v.clone(),
            NumericStorage::I16(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
            NumericStorage::U16(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
            NumericStorage::I32(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
            NumericStorage::U32(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
            NumericStorage::F32(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
            NumericStorage::F64(v) => v.iter().flat_map(|x| x.to_ne_bytes()).collect(),
            NumericStorage::Tag(v) => v
                .iter()
                .flat_map(|(g, e)| g.to_ne_bytes().into_iter().chain(e.to_ne_bytes()))
                .collect(),
        }
    }

    /// The `OW`/`US` typed slice, if this storage holds `u16` samples.
    /// Used by image codecs for zero-copy interleaved pixel access.
    pub fn as_u16_slice(&self) -> Option<&[u16]> {
        match self {
            NumericStorage::U16(v) => Some(v),
            _ => None,
        }
    }

    /// The `OB` typed slice, if this storage holds `u8` samples.
    pub fn as_u8_slice(&self) -> Option<&[u8]> {
        match self {
            NumericStorage::U8(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct NumericReadingHandler {
    tag: Tag,
    vr: VR,
    raw: rsdcm_core::Memory,
    storage: NumericStorage,
}

impl NumericReadingHandler {
    pub fn new(tag: Tag, vr: VR, raw: rsdcm_core::Memory) -> Self {
        let storage = NumericStorage::parse(vr, raw.as_slice());
        NumericReadingHandler { tag, vr, raw, storage }
    }

    pub fn storage(&self) -> &NumericStorage {
        &self.storage
    }
}

impl ReadingHandler for NumericReadingHandler {
    fn vr(&self) -> VR {
        self.vr
    }

    fn tag(&self) -> Tag {
        self.tag
    }

    fn len(&self) -> usize {
        self.storage.len()
    }

    fn get_int(&self, index: usize) -> Result<i64> {
        self.check_index(index)?;
        Ok(self.storage.as_i64(index))
    }

    fn get_double(&self, index: usize) -> Result<f64> {
        self.check_index(index)?;
        Ok(self.storage.as_f64(index))
    }

    fn get_string(&self, index: usize) -> Result<Cow<'_, str>> {
        self.check_index(index)?;
        Ok(Cow::Owned(self.storage.as_f64(index).to_string()))
    }

    fn raw_bytes(&self) -> &[u8] {
        self.raw.as_slice()
    }
}

#[derive(Debug)]
pub struct NumericWritingHandler {
    tag: Tag,
    vr: VR,
    values: Vec<f64>,
    ints: Vec<i64>,
    use_int: bool,
}

impl NumericWritingHandler {
    pub fn new(tag: Tag, vr: VR) -> Self {
        NumericWritingHandler { tag, vr, values: Vec::new(), ints: Vec::new(), use_int: true }
    }

    fn element_count(&self) -> usize {
        if self.use_int {
            self.ints.len()
        } else {
            self.values.len()
        }
    }
}

impl WritingHandler for NumericWritingHandler {
    fn vr(&self) -> VR {
        self.vr
    }

    fn set_size(&mut self, count: usize) {
        if self.ints.len() < count {
            self.ints.resize(count, 0);
        }
        if self.values.len() < count {
            self.values.resize(count, 0.0);
        }
    }

    fn set_string(&mut self, _index: usize, _value: &str) -> Result<()> {
        error::ConversionSnafu { tag: self.tag, vr: self.vr }.fail()
    }

    fn set_int(&mut self, index: usize, value: i64) -> Result<()> {
        self.use_int = true;
        if self.ints.len() <= index {
            self.ints.resize(index + 1, 0);
        }
        self.ints[index] = value;
        Ok(())
    }

    fn set_double(&mut self, index: usize, value: f64) -> Result<()> {
        self.use_int = false;
        if self.values.len() <= index {
            self.values.resize(index + 1, 0.0);
        }
        self.values[index] = value;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let size = NumericStorage::element_size(self.vr);
        if size == 0 && self.vr != VR::AT {
            return error::ConversionSnafu { tag: self.tag, vr: self.vr }.fail();
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>> {
        self.validate()?;
        let count = self.element_count();
        let storage = match self.vr {
            VR::OB => NumericStorage::U8((0..count).map(|i| self.value_at(i) as u8).collect()),
            VR::OW | VR::US => {
                NumericStorage::U16((0..count).map(|i| self.value_at(i) as u16).collect())
            }
            VR::SS => NumericStorage::I16((0..count).map(|i| self.value_at(i) as i16).collect()),
            VR::SL => NumericStorage::I32((0..count).map(|i| self.value_at(i) as i32).collect()),
            VR::UL | VR::OL => NumericStorage::U32((0..count).map(|i| self.value_at(i) as u32).collect()),
            VR::FL | VR::OF => NumericStorage::F32((0..count).map(|i| self.value_at(i) as f32).collect()),
            VR::FD | VR::OD => NumericStorage::F64((0..count).map(|i| self.value_at(i)).collect()),
            VR::AT => NumericStorage::Tag(
                (0..count)
                    .map(|i| {
                        let raw = self.value_at(i) as u32;
                        ((raw >> 16) as u16, raw as u16)
                    })
                    .collect(),
            ),
            _ => return error::ConversionSnafu { tag: self.tag, vr: self.vr }.fail(),
        };
        let mut bytes = storage.to_bytes();
        if bytes.len() % 2 != 0 {
            bytes.push(self.vr.padding_byte());
        }
        Ok(bytes)
    }
}

impl NumericWritingHandler {
    fn value_at(&self, index: usize) -> f64 {
        if self.use_int {
            self.ints.get(index).copied().unwrap_or(0) as f64
        } else {
            self.values.get(index).copied().unwrap_or(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn us_roundtrips_through_bytes() {
        let bytes: Vec<u8> = [500u16, 65535u16].iter().flat_map(|x| x.to_ne_bytes()).collect();
        let h = NumericReadingHandler::new(Tag(0x0028, 0x0010), VR::US, rsdcm_core::Memory::from_vec(bytes));
        assert_eq!(h.get_int(0).unwrap(), 500);
        assert_eq!(h.get_int(1).unwrap(), 65535);
    }

    #[test]
    fn fd_roundtrips_through_bytes() {
        let bytes: Vec<u8> = [1.5f64].iter().flat_map(|x| x.to_ne_bytes()).collect();
        let h = NumericReadingHandler::new(Tag(0x0028, 0x1052), VR::FD, rsdcm_core::Memory::from_vec(bytes));
        assert_eq!(h.get_double(0).unwrap(), 1.5);
    }

    #[test]
    fn at_pairs_group_and_element() {
        let bytes: Vec<u8> = [0x0008u16, 0x0010u16].iter().flat_map(|x| x.to_ne_bytes()).collect();
        let h = NumericReadingHandler::new(Tag(0x0004, 0x1400), VR::AT, rsdcm_core::Memory::from_vec(bytes));
        assert_eq!(h.get_int(0).unwrap(), (0x0008i64 << 16) | 0x0010);
    }

    #[test]
    fn writing_handler_roundtrips_us() {
        let mut w = NumericWritingHandler::new(Tag(0x0028, 0x0010), VR::US);
        w.set_int(0, 512).unwrap();
        let bytes = Box::new(w).finish().unwrap();
        let h = NumericReadingHandler::new(Tag(0x0028, 0x0010), VR::US, rsdcm_core::Memory::from_vec(bytes));
        assert_eq!(h.get_int(0).unwrap(), 512);
    }
}
