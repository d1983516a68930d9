//! The element header codec: the part of `DicomStreamCodec` that reads and
//! writes one element's `{tag, vr, length}` triple (spec §4.5).
//!
//! This is deliberately stateless: every nuance of implicit/explicit VR,
//! long/short header form and byte order is a pure function of the
//! `TransferSyntax` passed in, plus (for implicit VR) a dictionary lookup.
//! The stateful part of the codec — recursing into sequences, tracking
//! undefined-length items, reassembling pixel-data fragments — is built on
//! top of these primitives by `rsdcm-object`, which is the layer that knows
//! what a `Dataset` is.

use crate::error::{self, Result};
use rsdcm_core::header::{item, Length, Tag, VR};
use rsdcm_core::stream::{adjust_endian, Endianness, StreamView};
use rsdcm_dictionary_std::DicomDict;
use rsdcm_transfer_syntax_registry::TransferSyntax;

/// One decoded element header.
#[derive(Debug, Clone, Copy)]
pub struct ElementHeader {
    pub tag: Tag,
    /// `None` for the pseudo-tags used to frame items and sequences
    /// (`(FFFE,E000)`, `(FFFE,E00D)`, `(FFFE,E0DD)`), which carry no VR.
    pub vr: Option<VR>,
    pub length: Length,
}

fn read_u16(stream: &mut StreamView, order: Endianness) -> Result<u16> {
    let mut buf = [0u8; 2];
    stream.read_fully(&mut buf)?;
    adjust_endian(&mut buf, 2, order);
    Ok(u16::from_ne_bytes(buf))
}

fn read_u32(stream: &mut StreamView, order: Endianness) -> Result<u32> {
    let mut buf = [0u8; 4];
    stream.read_fully(&mut buf)?;
    adjust_endian(&mut buf, 4, order);
    Ok(u32::from_ne_bytes(buf))
}

fn write_u16(out: &mut Vec<u8>, value: u16, order: Endianness) {
    let mut bytes = value.to_ne_bytes();
    adjust_endian(&mut bytes, 2, order);
    out.extend_from_slice(&bytes);
}

fn write_u32(out: &mut Vec<u8>, value: u32, order: Endianness) {
    let mut bytes = value.to_ne_bytes();
    adjust_endian(&mut bytes, 4, order);
    out.extend_from_slice(&bytes);
}

/// Reads one element header, dispatching on whether `tag` is an item
/// pseudo-tag, and otherwise on `ts.explicit_vr`.
///
/// Item/delimiter pseudo-tags (group `0xFFFE`) always use the bare
/// `{tag, length:u32}` form regardless of the transfer syntax's VR
/// encoding, per spec §4.5 ("Item framing").
pub fn read_element_header(
    stream: &mut StreamView,
    ts: &TransferSyntax,
    dict: &dyn DicomDict,
) -> Result<ElementHeader> {
    let group = read_u16(stream, ts.byte_order)?;
    let element = read_u16(stream, ts.byte_order)?;
    let tag = Tag(group, element);

    if group == 0xFFFE {
        let length = Length(read_u32(stream, ts.byte_order)?);
        return Ok(ElementHeader { tag, vr: None, length });
    }

    if !ts.explicit_vr {
        let length = Length(read_u32(stream, ts.byte_order)?);
        let vr = dict.vr_of(tag);
        return Ok(ElementHeader { tag, vr: Some(vr), length });
    }

    let mut vr_bytes = [0u8; 2];
    stream.read_fully(&mut vr_bytes)?;
    let vr = VR::from_binary(vr_bytes).ok_or(error::Error::UnknownVr { tag })?;
    let length = if vr.has_explicit_long_header() {
        let mut reserved = [0u8; 2];
        stream.read_fully(&mut reserved)?;
        Length(read_u32(stream, ts.byte_order)?)
    } else {
        Length(read_u16(stream, ts.byte_order)? as u32)
    };
    Ok(ElementHeader { tag, vr: Some(vr), length })
}

/// Writes one element header. `vr` is required for ordinary elements;
/// item/delimiter pseudo-tags are written with [`write_item_header`]
/// instead.
pub fn write_element_header(out: &mut Vec<u8>, tag: Tag, vr: VR, length: Length, ts: &TransferSyntax) {
    write_u16(out, tag.group(), ts.byte_order);
    write_u16(out, tag.element(), ts.byte_order);
    if !ts.explicit_vr {
        write_u32(out, length.0, ts.byte_order);
        return;
    }
    out.extend_from_slice(vr.as_str().as_bytes());
    if vr.has_explicit_long_header() {
        write_u16(out, 0, ts.byte_order); // reserved
        write_u32(out, length.0, ts.byte_order);
    } else {
        write_u16(out, length.0 as u16, ts.byte_order);
    }
}

/// Writes an item/delimiter pseudo-tag header: `{tag, length:u32}`, no VR,
/// regardless of the transfer syntax's VR encoding.
pub fn write_item_header(out: &mut Vec<u8>, tag: Tag, length: Length, ts: &TransferSyntax) {
    write_u16(out, tag.group(), ts.byte_order);
    write_u16(out, tag.element(), ts.byte_order);
    write_u32(out, length.0, ts.byte_order);
}

/// Shorthand for reading just a tag (used when resynchronizing after a
/// delimiter without needing the rest of [`ElementHeader`]).
pub fn read_tag(stream: &mut StreamView, ts: &TransferSyntax) -> Result<Tag> {
    let group = read_u16(stream, ts.byte_order)?;
    let element = read_u16(stream, ts.byte_order)?;
    Ok(Tag(group, element))
}

/// The well-known item pseudo-tags, re-exported for callers that only need
/// this module.
pub mod tags {
    pub use rsdcm_core::header::item::*;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsdcm_dictionary_std::StandardDataDictionary;
    use rsdcm_transfer_syntax_registry::transfer_syntax::for_uid;
    use std::io::Cursor;

    #[test]
    fn implicit_vr_header_looks_up_dictionary() {
        let ts = for_uid("1.2.840.10008.1.2").unwrap();
        let dict = StandardDataDictionary;
        // (0008,0060) Modality, length 2
        let data = vec![0x08, 0x00, 0x60, 0x00, 0x02, 0x00, 0x00, 0x00];
        let mut stream = StreamView::new_seekable(Cursor::new(data), None).unwrap();
        let header = read_element_header(&mut stream, ts, &dict).unwrap();
        assert_eq!(header.tag, Tag(0x0008, 0x0060));
        assert_eq!(header.vr, Some(VR::CS));
        assert_eq!(header.length.0, 2);
    }

    #[test]
    fn explicit_vr_short_form() {
        let ts = for_uid("1.2.840.10008.1.2.1").unwrap();
        let dict = StandardDataDictionary;
        let mut data = vec![0x08, 0x00, 0x60, 0x00];
        data.extend_from_slice(b"CS");
        data.extend_from_slice(&[2, 0]);
        let mut stream = StreamView::new_seekable(Cursor::new(data), None).unwrap();
        let header = read_element_header(&mut stream, ts, &dict).unwrap();
        assert_eq!(header.vr, Some(VR::CS));
        assert_eq!(header.length.0, 2);
    }

    #[test]
    fn explicit_vr_long_form_has_reserved_word() {
        let ts = for_uid("1.2.840.10008.1.2.1").unwrap();
        let dict = StandardDataDictionary;
        let mut data = vec![0xE0, 0x7F, 0x10, 0x00];
        data.extend_from_slice(b"OB");
        data.extend_from_slice(&[0, 0]); // reserved
        data.extend_from_slice(&100u32.to_le_bytes());
        let mut stream = StreamView::new_seekable(Cursor::new(data), None).unwrap();
        let header = read_element_header(&mut stream, ts, &dict).unwrap();
        assert_eq!(header.vr, Some(VR::OB));
        assert_eq!(header.length.0, 100);
    }

    #[test]
    fn item_pseudo_tag_always_uses_bare_form() {
        let ts = for_uid("1.2.840.10008.1.2.1").unwrap();
        let dict = StandardDataDictionary;
        let mut data = vec![0xFE, 0xFF, 0x00, 0xE0];
        data.extend_from_slice(&Length::UNDEFINED.0.to_le_bytes());
        let mut stream = StreamView::new_seekable(Cursor::new(data), None).unwrap();
        let header = read_element_header(&mut stream, ts, &dict).unwrap();
        assert_eq!(header.tag, item::ITEM);
        assert!(header.vr.is_none());
        assert!(header.length.is_undefined());
    }

    #[test]
    fn header_roundtrips_through_write_and_read() {
        let ts = for_uid("1.2.840.10008.1.2.1").unwrap();
        let dict = StandardDataDictionary;
        let mut out = Vec::new();
        write_element_header(&mut out, Tag(0x0028, 0x0010), VR::US, Length(2), ts);
        let mut stream = StreamView::new_seekable(Cursor::new(out), None).unwrap();
        let header = read_element_header(&mut stream, ts, &dict).unwrap();
        assert_eq!(header.tag, Tag(0x0028, 0x0010));
        assert_eq!(header.vr, Some(VR::US));
        assert_eq!(header.length.0, 2);
    }

    #[test]
    fn big_endian_transfer_syntax_round_trips() {
        let ts = for_uid("1.2.840.10008.1.2.2").unwrap();
        let dict = StandardDataDictionary;
        let mut out = Vec::new();
        write_element_header(&mut out, Tag(0x0028, 0x0010), VR::US, Length(512), ts);
        let mut stream = StreamView::new_seekable(Cursor::new(out), None).unwrap();
        let header = read_element_header(&mut stream, ts, &dict).unwrap();
        assert_eq!(header.length.0, 512);
    }
}
