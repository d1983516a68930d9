//! The file-meta-information group `0002` (spec §4.5, §6).
//!
//! Always explicit-VR little-endian, regardless of the body's declared
//! transfer syntax — this is why it is parsed and emitted independently of
//! the body [`Dataset`](crate::dataset::Dataset) rather than through it.

use crate::error::{Error, Result};
use rsdcm_core::header::{Tag, VR};
use rsdcm_core::stream::{adjust_endian, StreamView};
use rsdcm_dictionary_std::StandardDataDictionary;
use rsdcm_parser::header_codec::{read_element_header, write_element_header};
use rsdcm_transfer_syntax_registry::transfer_syntax;

const EXPLICIT_VR_LE: &str = "1.2.840.10008.1.2.1";

const T_GROUP_LENGTH: Tag = Tag(0x0002, 0x0000);
const T_INFO_VERSION: Tag = Tag(0x0002, 0x0001);
const T_SOP_CLASS_UID: Tag = Tag(0x0002, 0x0002);
const T_SOP_INSTANCE_UID: Tag = Tag(0x0002, 0x0003);
const T_TRANSFER_SYNTAX: Tag = Tag(0x0002, 0x0010);
const T_IMPLEMENTATION_CLASS_UID: Tag = Tag(0x0002, 0x0012);
const T_IMPLEMENTATION_VERSION_NAME: Tag = Tag(0x0002, 0x0013);
const T_SOURCE_AE_TITLE: Tag = Tag(0x0002, 0x0016);

/// The implementation class UID this crate identifies itself with when
/// writing a file it originated.
pub const IMPLEMENTATION_CLASS_UID: &str = "1.2.826.0.1.3680043.9.7779.1";
pub const IMPLEMENTATION_VERSION_NAME: &str = "RSDCM_001";

/// The parsed contents of group `0002`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetaTable {
    pub media_storage_sop_class_uid: String,
    pub media_storage_sop_instance_uid: String,
    pub transfer_syntax: String,
    pub implementation_class_uid: String,
    pub implementation_version_name: Option<String>,
    pub source_application_entity_title: Option<String>,
}

impl Default for FileMetaTable {
    fn default() -> Self {
        FileMetaTable {
            media_storage_sop_class_uid: String::new(),
            media_storage_sop_instance_uid: String::new(),
            transfer_syntax: EXPLICIT_VR_LE.to_string(),
            implementation_class_uid: IMPLEMENTATION_CLASS_UID.to_string(),
            implementation_version_name: Some(IMPLEMENTATION_VERSION_NAME.to_string()),
            source_application_entity_title: None,
        }
    }
}

fn trim_padding(bytes: &[u8]) -> &str {
    let trimmed = bytes.split(|&b| b == 0).next().unwrap_or(bytes);
    std::str::from_utf8(trimmed).unwrap_or_default().trim_end_matches(' ')
}

/// Reads group `0002` from `stream`, which must be positioned at its first
/// element (i.e. right after `DICM` or at byte `0` for a bare-element
/// stream).
pub fn read_file_meta(stream: &mut StreamView) -> Result<FileMetaTable> {
    let ts = transfer_syntax::for_uid(EXPLICIT_VR_LE).expect("built-in UID");
    let dict = StandardDataDictionary;

    let header = read_element_header(stream, ts, &dict)?;
    if header.tag != T_GROUP_LENGTH {
        return Err(Error::CorruptedFile {
            tag: header.tag,
            reason: "file-meta group must begin with (0002,0000)".to_string(),
        });
    }
    let group_length = {
        let len = header.length.get().ok_or_else(|| Error::CorruptedFile {
            tag: header.tag,
            reason: "group length must have a defined length".to_string(),
        })?;
        let mut buf = vec![0u8; len];
        stream.read_fully(&mut buf)?;
        adjust_endian(&mut buf, 4, ts.byte_order);
        u32::from_ne_bytes(buf.try_into().map_err(|_| Error::CorruptedFile {
            tag: header.tag,
            reason: "group length value must be 4 bytes".to_string(),
        })?)
    };

    let mut meta = FileMetaTable {
        media_storage_sop_class_uid: String::new(),
        media_storage_sop_instance_uid: String::new(),
        transfer_syntax: String::new(),
        implementation_class_uid: String::new(),
        implementation_version_name: None,
        source_application_entity_title: None,
    };

    let mut consumed = 0u64;
    while (consumed as u64) < group_length as u64 {
        let start = stream.position();
        let element = read_element_header(stream, ts, &dict)?;
        let len = element.length.get().unwrap_or(0);
        let mut value = vec![0u8; len];
        stream.read_fully(&mut value)?;

        match element.tag {
            T_INFO_VERSION => {}
            T_SOP_CLASS_UID => meta.media_storage_sop_class_uid = trim_padding(&value).to_string(),
            T_SOP_INSTANCE_UID => meta.media_storage_sop_instance_uid = trim_padding(&value).to_string(),
            T_TRANSFER_SYNTAX => meta.transfer_syntax = trim_padding(&value).to_string(),
            T_IMPLEMENTATION_CLASS_UID => meta.implementation_class_uid = trim_padding(&value).to_string(),
            T_IMPLEMENTATION_VERSION_NAME => {
                meta.implementation_version_name = Some(trim_padding(&value).to_string())
            }
            T_SOURCE_AE_TITLE => meta.source_application_entity_title = Some(trim_padding(&value).to_string()),
            _ => {} // unrecognized group-0002 elements are skipped, not fatal
        }

        consumed += stream.position() - start;
    }

    if meta.transfer_syntax.is_empty() {
        return Err(Error::CorruptedFile {
            tag: T_TRANSFER_SYNTAX,
            reason: "file-meta group is missing (0002,0010)".to_string(),
        });
    }

    Ok(meta)
}

fn push_padded_string(out: &mut Vec<u8>, tag: Tag, vr: VR, value: &str, ts: &rsdcm_transfer_syntax_registry::TransferSyntax) {
    let mut bytes = value.as_bytes().to_vec();
    if bytes.len() % 2 != 0 {
        bytes.push(vr.padding_byte());
    }
    write_element_header(out, tag, vr, rsdcm_core::header::Length(bytes.len() as u32), ts);
    out.extend_from_slice(&bytes);
}

/// Serializes `meta` to its on-disk explicit-VR-LE form, including the
/// leading `(0002,0000)` group-length element computed from the body.
pub fn write_file_meta(out: &mut Vec<u8>, meta: &FileMetaTable) {
    let ts = transfer_syntax::for_uid(EXPLICIT_VR_LE).expect("built-in UID");

    let mut body = Vec::new();
    write_element_header(&mut body, T_INFO_VERSION, VR::OB, rsdcm_core::header::Length(2), ts);
    body.extend_from_slice(&[0x00, 0x01]);
    push_padded_string(&mut body, T_SOP_CLASS_UID, VR::UI, &meta.media_storage_sop_class_uid, ts);
    push_padded_string(&mut body, T_SOP_INSTANCE_UID, VR::UI, &meta.media_storage_sop_instance_uid, ts);
    push_padded_string(&mut body, T_TRANSFER_SYNTAX, VR::UI, &meta.transfer_syntax, ts);
    push_padded_string(&mut body, T_IMPLEMENTATION_CLASS_UID, VR::UI, &meta.implementation_class_uid, ts);
    if let Some(name) = &meta.implementation_version_name {
        push_padded_string(&mut body, T_IMPLEMENTATION_VERSION_NAME, VR::SH, name, ts);
    }
    if let Some(ae) = &meta.source_application_entity_title {
        push_padded_string(&mut body, T_SOURCE_AE_TITLE, VR::AE, ae, ts);
    }

    write_element_header(out, T_GROUP_LENGTH, VR::UL, rsdcm_core::header::Length(4), ts);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn meta_round_trips_through_write_and_read() {
        let meta = FileMetaTable {
            media_storage_sop_class_uid: "1.2.840.10008.5.1.4.1.1.7".to_string(),
            media_storage_sop_instance_uid: "1.2.3.4.5".to_string(),
            transfer_syntax: "1.2.840.10008.1.2.1".to_string(),
            implementation_class_uid: IMPLEMENTATION_CLASS_UID.to_string(),
            implementation_version_name: Some(IMPLEMENTATION_VERSION_NAME.to_string()),
            source_application_entity_title: None,
        };
        let mut bytes = Vec::new();
        write_file_meta(&mut bytes, &meta);
        let len = bytes.len() as u64;
        let mut stream = StreamView::new_seekable(Cursor::new(bytes), Some(len)).unwrap();
        let parsed = read_file_meta(&mut stream).unwrap();
        assert_eq!(parsed, meta);
    }

    #[test]
    fn transfer_syntax_uid_is_even_length_padded() {
        let mut meta = FileMetaTable::default();
        meta.transfer_syntax = "1.2.840.10008.1.2".to_string(); // 17 chars, odd
        let mut bytes = Vec::new();
        write_file_meta(&mut bytes, &meta);
        let len = bytes.len() as u64;
        let mut stream = StreamView::new_seekable(Cursor::new(bytes), Some(len)).unwrap();
        let parsed = read_file_meta(&mut stream).unwrap();
        assert_eq!(parsed.transfer_syntax, "1.2.840.10008.1.2");
    }

    #[test]
    fn missing_group_length_header_is_corrupted_file() {
        let data = vec![0x08, 0x00, 0x60, 0x00, b'C', b'S', 2, 0, b'C', b'T'];
        let len = data.len() as u64;
        let mut stream = StreamView::new_seekable(Cursor::new(data), Some(len)).unwrap();
        assert!(matches!(read_file_meta(&mut stream), Err(Error::CorruptedFile { .. })));
    }
}
