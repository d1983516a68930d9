//! The recursive dataset-assembly codec and file-level read/write entry
//! points (spec §4.5).
//!
//! `rsdcm-parser` only knows how to decode one element's header at a time;
//! this module walks a whole element stream, recursing into sequences,
//! tracking undefined-length items and delimiters, and reassembling
//! encapsulated pixel-data fragments into a [`Dataset`](crate::dataset::Dataset)
//! tree. It is the stateful layer `rsdcm-parser` was deliberately kept free
//! of so that this crate — not `rsdcm-parser` — could depend on
//! `rsdcm-dictionary-std`'s `DicomDict` and own the tree it builds.

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::meta::{self, FileMetaTable};
use rsdcm_core::header::{Length, Tag, VR};
use rsdcm_core::memory::Memory;
use rsdcm_core::stream::{adjust_endian, StreamView};
use rsdcm_dictionary_std::DicomDict;
use rsdcm_encoding::buffer::Buffer;
use rsdcm_parser::header_codec::{read_element_header, tags};
use rsdcm_transfer_syntax_registry::factory::{detect_container, ContainerKind};
use rsdcm_transfer_syntax_registry::{transfer_syntax, TransferSyntax};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

/// The number of bytes a preamble-form file reserves before `DICM`.
const PREAMBLE_LEN: u64 = 132;

fn endian_word_size(vr: VR) -> usize {
    match vr {
        VR::US | VR::SS | VR::OW | VR::AT => 2,
        VR::UL | VR::SL | VR::FL | VR::OF | VR::OL => 4,
        VR::FD | VR::OD => 8,
        _ => 1,
    }
}

fn read_ordinary_element(stream: &mut StreamView, ts: &TransferSyntax, dataset: &Dataset, tag: Tag, vr: VR, length: Length) -> Result<()> {
    let len = length.get().ok_or_else(|| Error::CorruptedFile {
        tag,
        reason: "element has undefined length but is neither SQ nor encapsulated pixel data".to_string(),
    })?;
    let word_size = endian_word_size(vr);
    let is_blob = matches!(vr, VR::OB | VR::OW | VR::OF | VR::OL | VR::OD | VR::UN);

    let buffer = if is_blob && stream.is_seekable() && len > 0 {
        let window = stream.window(0, len as u64)?;
        stream.skip(len as u64)?;
        Arc::new(Buffer::new_deferred(tag, vr, window, word_size, ts.byte_order))
    } else {
        let mut bytes = vec![0u8; len];
        stream.read_fully(&mut bytes)?;
        adjust_endian(&mut bytes, word_size, ts.byte_order);
        Arc::new(Buffer::new_resident(tag, vr, Memory::from_vec(bytes)))
    };
    dataset.insert_element(tag, vr, vec![buffer]);
    Ok(())
}

/// Reads one item's body (its element stream) into a freshly appended
/// sequence item, or `Ok(false)` if `(FFFE,E0DD)` was found instead of an
/// item, signalling the end of an undefined-length sequence.
fn read_one_item(stream: &mut StreamView, ts: &TransferSyntax, dict: &dyn DicomDict, parent: &Dataset, seq_tag: Tag) -> Result<bool> {
    let header = read_element_header(stream, ts, dict)?;
    if header.tag == tags::SEQUENCE_DELIMITER {
        return Ok(false);
    }
    if header.tag != tags::ITEM {
        return Err(Error::CorruptedFile {
            tag: seq_tag,
            reason: format!("expected item or sequence delimiter, found {}", header.tag),
        });
    }

    let item = parent.append_sequence_item(seq_tag)?;
    match header.length.get() {
        Some(len) => {
            let mut window = stream.window(0, len as u64)?;
            stream.skip(len as u64)?;
            read_elements(&mut window, ts, dict, &item, false)?;
        }
        None => read_elements(stream, ts, dict, &item, true)?,
    }
    Ok(true)
}

fn read_sequence_into(stream: &mut StreamView, ts: &TransferSyntax, dict: &dyn DicomDict, parent: &Dataset, tag: Tag, length: Length) -> Result<()> {
    match length.get() {
        Some(len) => {
            let mut window = stream.window(0, len as u64)?;
            stream.skip(len as u64)?;
            while !window.end_reached() {
                read_one_item(&mut window, ts, dict, parent, tag)?;
            }
        }
        None => while read_one_item(stream, ts, dict, parent, tag)? {},
    }
    Ok(())
}

/// Reassembles encapsulated pixel data (spec §4.6: basic offset table at
/// fragment `0`, one or more compressed-frame fragments after it).
fn read_encapsulated_pixel_data(stream: &mut StreamView, ts: &TransferSyntax, dict: &dyn DicomDict, dataset: &Dataset, tag: Tag, vr: VR) -> Result<()> {
    let mut buffers = Vec::new();
    loop {
        let header = read_element_header(stream, ts, dict)?;
        if header.tag == tags::SEQUENCE_DELIMITER {
            break;
        }
        if header.tag != tags::ITEM {
            return Err(Error::CorruptedFile {
                tag,
                reason: format!("expected a pixel-data fragment item, found {}", header.tag),
            });
        }
        let len = header.length.get().ok_or_else(|| Error::CorruptedFile {
            tag,
            reason: "pixel-data fragment item must have a defined length".to_string(),
        })?;
        let mut bytes = vec![0u8; len];
        stream.read_fully(&mut bytes)?;
        buffers.push(Arc::new(Buffer::new_resident(tag, vr, Memory::from_vec(bytes))));
    }
    dataset.insert_element(tag, vr, buffers);
    Ok(())
}

/// Reads elements from `stream` into `dataset` until either `stream` is
/// exhausted (`until_item_delimiter == false`, the ordinary case: top-level
/// dataset or a defined-length sequence item) or `(FFFE,E00D)` is seen
/// (`until_item_delimiter == true`: an undefined-length sequence item).
fn read_elements(stream: &mut StreamView, ts: &TransferSyntax, dict: &dyn DicomDict, dataset: &Dataset, until_item_delimiter: bool) -> Result<()> {
    loop {
        if !until_item_delimiter && stream.end_reached() {
            return Ok(());
        }
        let header = read_element_header(stream, ts, dict)?;
        if until_item_delimiter && header.tag == tags::ITEM_DELIMITER {
            return Ok(());
        }

        // Group-length elements are redundant bookkeeping recomputed on
        // write, not part of the tag tree (spec §4.4 addresses ordinary
        // elements only).
        if header.tag.element() == 0 {
            if let Some(len) = header.length.get() {
                stream.skip(len as u64)?;
            }
            continue;
        }

        if header.vr == Some(VR::SQ) {
            read_sequence_into(stream, ts, dict, dataset, header.tag, header.length)?;
            continue;
        }

        let vr = header.vr.unwrap_or(VR::UN);
        if header.tag == rsdcm_core::header::PIXEL_DATA && header.length.is_undefined() {
            read_encapsulated_pixel_data(stream, ts, dict, dataset, header.tag, vr)?;
            continue;
        }

        read_ordinary_element(stream, ts, dataset, header.tag, vr, header.length)?;
    }
}

/// Reads a whole DICOM stream — file-meta group followed by the body
/// dataset — autodetecting the preamble vs. bare-element container form
/// (spec §4.5).
pub fn read_stream(mut stream: StreamView, dict: &dyn DicomDict) -> Result<(FileMetaTable, Dataset)> {
    match detect_container(&stream)? {
        ContainerKind::Preamble => {
            stream.skip(PREAMBLE_LEN)?;
        }
        ContainerKind::BareElement => {
            tracing::debug!("no preamble detected, reading as a bare-element stream");
        }
    }

    let file_meta = meta::read_file_meta(&mut stream)?;
    let ts = transfer_syntax::for_uid(&file_meta.transfer_syntax)
        .ok_or_else(|| Error::WrongTransferSyntax { uid: file_meta.transfer_syntax.clone() })?;

    let dataset = Dataset::new();
    dataset.set_transfer_syntax(file_meta.transfer_syntax.clone());
    read_elements(&mut stream, ts, dict, &dataset, false)?;
    Ok((file_meta, dataset))
}

/// Reads a DICOM file from `path`.
pub fn read_file(path: impl AsRef<Path>, dict: &dyn DicomDict) -> Result<(FileMetaTable, Dataset)> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    let mut bytes = Vec::with_capacity(len as usize);
    file.read_to_end(&mut bytes)?;
    let stream = StreamView::new_seekable(std::io::Cursor::new(bytes), Some(len))?;
    read_stream(stream, dict)
}

fn write_sequence(out: &mut Vec<u8>, ts: &TransferSyntax, tag: Tag, items: &[Dataset]) -> Result<()> {
    use rsdcm_parser::header_codec::{write_element_header, write_item_header};

    let mut body = Vec::new();
    for item in items {
        let mut item_bytes = Vec::new();
        write_dataset_body(&mut item_bytes, ts, item)?;
        write_item_header(&mut body, tags::ITEM, Length(item_bytes.len() as u32), ts);
        body.extend_from_slice(&item_bytes);
    }
    write_element_header(out, tag, VR::SQ, Length(body.len() as u32), ts);
    out.extend_from_slice(&body);
    Ok(())
}

fn write_pixel_data_fragments(out: &mut Vec<u8>, ts: &TransferSyntax, dataset: &Dataset, tag: Tag, vr: VR) -> Result<()> {
    use rsdcm_parser::header_codec::{write_element_header, write_item_header};

    let count = dataset.buffer_count(tag)?;
    let mut body = Vec::new();
    for index in 0..count {
        let buf = dataset.get_buffer(tag, index)?;
        let raw = buf.get_raw_reading_handler()?;
        write_item_header(&mut body, tags::ITEM, Length(raw.bytes().len() as u32), ts);
        body.extend_from_slice(raw.bytes());
    }
    write_element_header(out, tag, vr, Length::UNDEFINED, ts);
    out.extend_from_slice(&body);
    write_item_header(out, tags::SEQUENCE_DELIMITER, Length(0), ts);
    Ok(())
}

fn write_ordinary_element(out: &mut Vec<u8>, ts: &TransferSyntax, dataset: &Dataset, tag: Tag, vr: VR) -> Result<()> {
    use rsdcm_parser::header_codec::write_element_header;

    let buf = dataset.get_buffer(tag, 0)?;
    let raw = buf.get_raw_reading_handler()?;
    let mut bytes = raw.bytes().to_vec();
    adjust_endian(&mut bytes, endian_word_size(vr), ts.byte_order);
    if bytes.len() % 2 != 0 {
        bytes.push(vr.padding_byte());
    }
    write_element_header(out, tag, vr, Length(bytes.len() as u32), ts);
    out.extend_from_slice(&bytes);
    Ok(())
}

/// Serializes `dataset`'s tags (without any file-meta header) into `out`
/// using `ts`. Walks tags in `(group, element)` order via
/// [`Dataset::group_occurrence_count`]/lookups exposed for iteration.
fn write_dataset_body(out: &mut Vec<u8>, ts: &TransferSyntax, dataset: &Dataset) -> Result<()> {
    for (tag, vr) in dataset.iter_tags() {
        if vr == VR::SQ {
            let len = dataset.sequence_len(tag)?;
            let items: Vec<Dataset> = (0..len).map(|i| dataset.get_sequence_item(tag, i)).collect::<Result<_>>()?;
            write_sequence(out, ts, tag, &items)?;
        } else if tag == rsdcm_core::header::PIXEL_DATA && dataset.buffer_count(tag)? > 1 {
            write_pixel_data_fragments(out, ts, dataset, tag, vr)?;
        } else {
            write_ordinary_element(out, ts, dataset, tag, vr)?;
        }
    }
    Ok(())
}

/// Serializes `dataset` to its on-disk form: the file-meta group, always
/// explicit-VR-LE, followed by the body under `dataset`'s own declared
/// transfer syntax.
pub fn write_stream(out: &mut Vec<u8>, meta_table: &FileMetaTable, dataset: &Dataset) -> Result<()> {
    out.extend_from_slice(&[0u8; 128]);
    out.extend_from_slice(b"DICM");
    meta::write_file_meta(out, meta_table);

    let ts = transfer_syntax::for_uid(&meta_table.transfer_syntax)
        .ok_or_else(|| Error::WrongTransferSyntax { uid: meta_table.transfer_syntax.clone() })?;
    write_dataset_body(out, ts, dataset)
}

/// Writes `dataset` to `path` under `meta_table`'s declared transfer syntax,
/// with the standard 128-byte preamble and `DICM` magic.
pub fn write_file(path: impl AsRef<Path>, meta_table: &FileMetaTable, dataset: &Dataset) -> Result<()> {
    let mut bytes = Vec::new();
    write_stream(&mut bytes, meta_table, dataset)?;
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsdcm_dictionary_std::StandardDataDictionary;
    use std::io::Cursor;

    fn dict() -> StandardDataDictionary {
        StandardDataDictionary
    }

    fn sample_meta() -> FileMetaTable {
        FileMetaTable {
            media_storage_sop_class_uid: "1.2.840.10008.5.1.4.1.1.7".to_string(),
            media_storage_sop_instance_uid: "1.2.3.4.5.6".to_string(),
            transfer_syntax: "1.2.840.10008.1.2.1".to_string(),
            implementation_class_uid: meta::IMPLEMENTATION_CLASS_UID.to_string(),
            implementation_version_name: Some(meta::IMPLEMENTATION_VERSION_NAME.to_string()),
            source_application_entity_title: None,
        }
    }

    #[test]
    fn round_trips_a_flat_dataset_through_bare_and_preamble_forms() {
        let dataset = Dataset::new();
        dataset.set_transfer_syntax("1.2.840.10008.1.2.1");
        dataset.set_string(Tag(0x0008, 0x0060), "CT", &dict()).unwrap();
        dataset.set_string(Tag(0x0010, 0x0010), "Doe^John", &dict()).unwrap();

        let mut bytes = Vec::new();
        write_stream(&mut bytes, &sample_meta(), &dataset).unwrap();

        let len = bytes.len() as u64;
        let stream = StreamView::new_seekable(Cursor::new(bytes), Some(len)).unwrap();
        let (meta_read, read_back) = read_stream(stream, &dict()).unwrap();

        assert_eq!(meta_read.transfer_syntax, "1.2.840.10008.1.2.1");
        assert_eq!(read_back.get_string(Tag(0x0008, 0x0060), 0).unwrap(), "CT");
        assert_eq!(read_back.get_string(Tag(0x0010, 0x0010), 0).unwrap(), "Doe^John");
    }

    #[test]
    fn round_trips_a_nested_sequence() {
        let dataset = Dataset::new();
        dataset.set_transfer_syntax("1.2.840.10008.1.2.1");
        let item = dataset.append_sequence_item(Tag(0x0008, 0x1140)).unwrap();
        item.set_string(Tag(0x0008, 0x1150), "1.2.3", &dict()).unwrap();

        let mut bytes = Vec::new();
        write_stream(&mut bytes, &sample_meta(), &dataset).unwrap();
        let len = bytes.len() as u64;
        let stream = StreamView::new_seekable(Cursor::new(bytes), Some(len)).unwrap();
        let (_meta, read_back) = read_stream(stream, &dict()).unwrap();

        assert_eq!(read_back.sequence_len(Tag(0x0008, 0x1140)).unwrap(), 1);
        let read_item = read_back.get_sequence_item(Tag(0x0008, 0x1140), 0).unwrap();
        assert_eq!(read_item.get_string(Tag(0x0008, 0x1150), 0).unwrap(), "1.2.3");
    }

    #[test]
    fn round_trips_implicit_vr_little_endian() {
        let dataset = Dataset::new();
        dataset.set_transfer_syntax("1.2.840.10008.1.2");
        dataset.set_int(Tag(0x0028, 0x0010), 512, &dict()).unwrap();

        let mut meta_table = sample_meta();
        meta_table.transfer_syntax = "1.2.840.10008.1.2".to_string();
        let mut bytes = Vec::new();
        write_stream(&mut bytes, &meta_table, &dataset).unwrap();
        let len = bytes.len() as u64;
        let stream = StreamView::new_seekable(Cursor::new(bytes), Some(len)).unwrap();
        let (meta_read, read_back) = read_stream(stream, &dict()).unwrap();

        assert_eq!(meta_read.transfer_syntax, "1.2.840.10008.1.2");
        assert_eq!(read_back.get_int(Tag(0x0028, 0x0010), 0).unwrap(), 512);
    }

    #[test]
    fn writes_the_standard_preamble_and_magic() {
        let dataset = Dataset::new();
        dataset.set_transfer_syntax("1.2.840.10008.1.2.1");
        let mut bytes = Vec::new();
        write_stream(&mut bytes, &sample_meta(), &dataset).unwrap();
        assert_eq!(&bytes[128..132], b"DICM");
    }
}
