//! Round-trips a dataset through a real file on disk, exercising the
//! `std::fs`-backed entry points that `file.rs`'s unit tests (in-memory
//! `Cursor`s only) don't touch.

use rsdcm_core::header::Tag;
use rsdcm_dictionary_std::StandardDataDictionary;
use rsdcm_object::{read_file, write_file, Dataset, FileMetaTable};

fn sample_meta() -> FileMetaTable {
    FileMetaTable {
        media_storage_sop_class_uid: "1.2.840.10008.5.1.4.1.1.7".to_string(),
        media_storage_sop_instance_uid: "1.2.3.4.5.6".to_string(),
        transfer_syntax: "1.2.840.10008.1.2.1".to_string(),
        implementation_class_uid: rsdcm_object::meta::IMPLEMENTATION_CLASS_UID.to_string(),
        implementation_version_name: Some(rsdcm_object::meta::IMPLEMENTATION_VERSION_NAME.to_string()),
        source_application_entity_title: None,
    }
}

#[test]
fn writes_and_reads_back_a_file_on_disk() {
    let dict = StandardDataDictionary;
    let dataset = Dataset::new();
    dataset.set_transfer_syntax("1.2.840.10008.1.2.1");
    dataset.set_string(Tag(0x0008, 0x0060), "MR", &dict).unwrap();
    dataset.set_int(Tag(0x0028, 0x0010), 256, &dict).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.dcm");
    write_file(&path, &sample_meta(), &dataset).unwrap();

    let (meta, read_back) = read_file(&path, &dict).unwrap();
    assert_eq!(meta.transfer_syntax, "1.2.840.10008.1.2.1");
    assert_eq!(read_back.get_string(Tag(0x0008, 0x0060), 0).unwrap(), "MR");
    assert_eq!(read_back.get_int(Tag(0x0028, 0x0010), 0).unwrap(), 256);
}

#[test]
fn round_trips_a_sequence_through_a_file() {
    let dict = StandardDataDictionary;
    let dataset = Dataset::new();
    dataset.set_transfer_syntax("1.2.840.10008.1.2.1");
    let item = dataset.append_sequence_item(Tag(0x0008, 0x1140)).unwrap();
    item.set_string(Tag(0x0008, 0x1150), "1.2.3.4", &dict).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sequence.dcm");
    write_file(&path, &sample_meta(), &dataset).unwrap();

    let (_meta, read_back) = read_file(&path, &dict).unwrap();
    assert_eq!(read_back.sequence_len(Tag(0x0008, 0x1140)).unwrap(), 1);
    let read_item = read_back.get_sequence_item(Tag(0x0008, 0x1140), 0).unwrap();
    assert_eq!(read_item.get_string(Tag(0x0008, 0x1150), 0).unwrap(), "1.2.3.4");
}
