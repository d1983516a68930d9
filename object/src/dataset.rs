//! `Dataset`: the indexed tree of tags (spec §4.4).
//!
//! Modeled directly on the data model in spec §3: `map<group_id →
//! vector<group_occurrence>>`, each occurrence a `map<element_id → Tag>`.
//! The `order` index (position within a group's occurrence vector) exists to
//! accept legacy files that repeat a whole group block; ordinary files only
//! ever populate occurrence `0`, and every convenience method here addresses
//! that occurrence unless told otherwise.
//!
//! `Dataset` is a cheap-clone `Arc` handle, mirroring `Memory`/`StreamView`'s
//! style in `rsdcm-core`. Its tag tree is guarded by a
//! [`parking_lot::ReentrantMutex`] wrapping a `RefCell`, so the same thread
//! can recurse into a child Dataset (a sequence item) while still holding its
//! parent's lock, without needing manual re-entrancy bookkeeping — the
//! `Dataset`-before-`Buffer`, parent-before-child order required by spec §5
//! falls out naturally since each `Buffer` has its own independent mutex.

use crate::error::{Error, Result};
use parking_lot::{Mutex, ReentrantMutex};
use rsdcm_core::charset::{CharsetCollector, IsoIr6};
use rsdcm_core::header::{Tag, VR};
use rsdcm_core::memory::Memory;
use rsdcm_dictionary_std::DicomDict;
use rsdcm_encoding::buffer::Buffer;
use rsdcm_encoding::handler::datetime::{
    format_as, format_da, format_dt, format_tm, DateTimeReadingHandler, DicomAge, DicomDate, DicomDateTime,
    DicomTime,
};
use rsdcm_encoding::handler::person_name::PersonNameGroups;
use rsdcm_encoding::handler::WritingHandler;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The default transfer syntax a freshly built `Dataset` claims before any
/// file-meta header has been read or an explicit choice made: Explicit VR
/// Little Endian, the most commonly produced interchange syntax.
const DEFAULT_TRANSFER_SYNTAX: &str = "1.2.840.10008.1.2.1";

#[derive(Debug, Clone)]
struct TagEntry {
    vr: VR,
    value: TagValue,
}

#[derive(Debug, Clone)]
enum TagValue {
    /// One buffer per fragment; ordinary tags have exactly one at index 0.
    /// Encapsulated pixel data has a basic-offset-table buffer at index 0
    /// followed by one buffer per fragment.
    Buffers(Vec<Arc<Buffer>>),
    /// A sequence's items, each a nested `Dataset`.
    Sequence(Vec<Dataset>),
}

type GroupMap = BTreeMap<u16, Vec<BTreeMap<u16, TagEntry>>>;

struct Inner {
    tree: ReentrantMutex<RefCell<GroupMap>>,
    transfer_syntax: Mutex<String>,
    charsets_list: Mutex<Vec<String>>,
    item_offset: AtomicU64,
    charset_collector: Arc<dyn CharsetCollector>,
}

/// The tag tree described in spec §4.4, plus the dataset-wide attributes
/// (`transferSyntax`, `charsetsList`, `itemOffset`) every tag transitively
/// sees.
#[derive(Clone)]
pub struct Dataset {
    inner: Arc<Inner>,
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("transfer_syntax", &self.transfer_syntax())
            .field("ptr", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new()
    }
}

impl Dataset {
    /// Builds an empty dataset with the default transfer syntax and the
    /// dependency-free `ISO_IR 6` charset collector.
    pub fn new() -> Self {
        Self::with_collector(Arc::new(IsoIr6))
    }

    /// Builds an empty dataset using the given charset collector (plugged in
    /// by a caller with a real transcoding library).
    pub fn with_collector(collector: Arc<dyn CharsetCollector>) -> Self {
        Dataset {
            inner: Arc::new(Inner {
                tree: ReentrantMutex::new(RefCell::new(BTreeMap::new())),
                transfer_syntax: Mutex::new(DEFAULT_TRANSFER_SYNTAX.to_string()),
                charsets_list: Mutex::new(Vec::new()),
                item_offset: AtomicU64::new(0),
                charset_collector: collector,
            }),
        }
    }

    fn new_child(&self) -> Dataset {
        Dataset {
            inner: Arc::new(Inner {
                tree: ReentrantMutex::new(RefCell::new(BTreeMap::new())),
                transfer_syntax: Mutex::new(self.transfer_syntax()),
                charsets_list: Mutex::new(self.charsets_list()),
                item_offset: AtomicU64::new(0),
                charset_collector: self.inner.charset_collector.clone(),
            }),
        }
    }

    /// The transfer syntax UID read from `(0002,0010)`, or the default if
    /// none has been set.
    pub fn transfer_syntax(&self) -> String {
        self.inner.transfer_syntax.lock().clone()
    }

    pub fn set_transfer_syntax(&self, uid: impl Into<String>) {
        *self.inner.transfer_syntax.lock() = uid.into();
    }

    /// The ordered charset names from `(0008,0005)`; empty means `ISO_IR 6`.
    pub fn charsets_list(&self) -> Vec<String> {
        self.inner.charsets_list.lock().clone()
    }

    pub fn set_charsets_list(&self, list: Vec<String>) {
        *self.inner.charsets_list.lock() = list;
    }

    /// The byte position at which this dataset was located within its
    /// enclosing stream (used for DICOMDIR references).
    pub fn item_offset(&self) -> u64 {
        self.inner.item_offset.load(Ordering::Acquire)
    }

    pub fn set_item_offset(&self, offset: u64) {
        self.inner.item_offset.store(offset, Ordering::Release);
    }

    pub fn charset_collector(&self) -> Arc<dyn CharsetCollector> {
        self.inner.charset_collector.clone()
    }

    /// The number of group occurrences recorded for `group` (almost always
    /// `1`; more only for legacy files repeating a whole group block).
    pub fn group_occurrence_count(&self, group: u16) -> usize {
        let guard = self.inner.tree.lock();
        guard.borrow().get(&group).map(Vec::len).unwrap_or(0)
    }

    /// Starts a fresh occurrence of `group`, returning its index. Used by
    /// the stream codec when it detects a repeated legacy group block.
    pub fn append_group_occurrence(&self, group: u16) -> usize {
        let guard = self.inner.tree.lock();
        let mut map = guard.borrow_mut();
        let occurrences = map.entry(group).or_insert_with(Vec::new);
        occurrences.push(BTreeMap::new());
        occurrences.len() - 1
    }

    fn lookup(&self, tag: Tag) -> Result<TagEntry> {
        let guard = self.inner.tree.lock();
        let map = guard.borrow();
        let occurrences = map.get(&tag.group()).ok_or(Error::MissingGroup { tag })?;
        let occ0 = occurrences.first().ok_or(Error::MissingGroup { tag })?;
        occ0.get(&tag.element()).cloned().ok_or(Error::MissingTag { tag })
    }

    /// The VR currently recorded for `tag`.
    pub fn vr_of(&self, tag: Tag) -> Result<VR> {
        self.lookup(tag).map(|e| e.vr)
    }

    /// Whether `tag` is present (occurrence 0).
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.lookup(tag).is_ok()
    }

    /// Inserts an empty tag at `tag` if not already present, with `vr_hint`
    /// if given or else the dictionary's canonical VR. A no-op if the tag
    /// already exists.
    pub fn get_or_create_tag(&self, tag: Tag, vr_hint: Option<VR>, dict: &dyn DicomDict) -> Result<()> {
        let guard = self.inner.tree.lock();
        let mut map = guard.borrow_mut();
        let occurrences = map.entry(tag.group()).or_insert_with(|| vec![BTreeMap::new()]);
        if occurrences.is_empty() {
            occurrences.push(BTreeMap::new());
        }
        let occ0 = &mut occurrences[0];
        if !occ0.contains_key(&tag.element()) {
            let vr = vr_hint.unwrap_or_else(|| dict.vr_of(tag));
            let buffer = Arc::new(Buffer::new_resident(tag, vr, Memory::empty()));
            occ0.insert(tag.element(), TagEntry { vr, value: TagValue::Buffers(vec![buffer]) });
        }
        Ok(())
    }

    /// Removes `tag` (occurrence 0) entirely, returning whether it was
    /// present.
    pub fn remove_tag(&self, tag: Tag) -> bool {
        let guard = self.inner.tree.lock();
        let mut map = guard.borrow_mut();
        match map.get_mut(&tag.group()) {
            Some(occurrences) => match occurrences.first_mut() {
                Some(occ0) => occ0.remove(&tag.element()).is_some(),
                None => false,
            },
            None => false,
        }
    }

    /// Directly inserts a parsed element's already-built buffers (used by
    /// the stream codec while reading, which already knows the VR and has
    /// the fragment buffers in hand). Targets occurrence 0 unless the
    /// element is already present there, in which case a fresh occurrence is
    /// started — this is how a legacy repeated group block is detected on
    /// read, without the codec having to track group boundaries itself.
    pub fn insert_element(&self, tag: Tag, vr: VR, buffers: Vec<Arc<Buffer>>) {
        let guard = self.inner.tree.lock();
        let mut map = guard.borrow_mut();
        let occurrences = map.entry(tag.group()).or_insert_with(|| vec![BTreeMap::new()]);
        if occurrences.is_empty() {
            occurrences.push(BTreeMap::new());
        }
        let needs_new_occurrence = occurrences.last().map(|o| o.contains_key(&tag.element())).unwrap_or(false);
        if needs_new_occurrence {
            occurrences.push(BTreeMap::new());
        }
        let occ = occurrences.last_mut().expect("just ensured non-empty");
        occ.insert(tag.element(), TagEntry { vr, value: TagValue::Buffers(buffers) });
    }

    /// Inserts a (possibly still-empty) `SQ` entry for `tag` directly,
    /// analogous to [`insert_element`](Dataset::insert_element) but for
    /// sequences. Used by the stream codec while reading nested items.
    pub fn insert_sequence(&self, tag: Tag, items: Vec<Dataset>) {
        let guard = self.inner.tree.lock();
        let mut map = guard.borrow_mut();
        let occurrences = map.entry(tag.group()).or_insert_with(|| vec![BTreeMap::new()]);
        if occurrences.is_empty() {
            occurrences.push(BTreeMap::new());
        }
        let occ0 = &mut occurrences[0];
        occ0.insert(tag.element(), TagEntry { vr: VR::SQ, value: TagValue::Sequence(items) });
    }

    /// The number of buffers (fragments) stored at `tag`.
    pub fn buffer_count(&self, tag: Tag) -> Result<usize> {
        match self.lookup(tag)?.value {
            TagValue::Buffers(bufs) => Ok(bufs.len()),
            TagValue::Sequence(_) => Err(Error::IsSequence { tag }),
        }
    }

    /// The buffer at `tag`'s fragment `index`.
    pub fn get_buffer(&self, tag: Tag, index: usize) -> Result<Arc<Buffer>> {
        match self.lookup(tag)?.value {
            TagValue::Buffers(bufs) => bufs.get(index).cloned().ok_or(Error::MissingTag { tag }),
            TagValue::Sequence(_) => Err(Error::IsSequence { tag }),
        }
    }

    /// Appends a new fragment buffer to `tag`'s buffer list, sharing `tag`'s
    /// recorded VR. Used while reassembling encapsulated pixel data or while
    /// `setImage` appends a new frame's fragment.
    pub fn push_fragment(&self, tag: Tag, memory: Memory) -> Result<()> {
        let guard = self.inner.tree.lock();
        let mut map = guard.borrow_mut();
        let occurrences = map.get_mut(&tag.group()).ok_or(Error::MissingGroup { tag })?;
        let occ0 = occurrences.first_mut().ok_or(Error::MissingGroup { tag })?;
        let entry = occ0.get_mut(&tag.element()).ok_or(Error::MissingTag { tag })?;
        match &mut entry.value {
            TagValue::Buffers(bufs) => {
                bufs.push(Arc::new(Buffer::new_resident(tag, entry.vr, memory)));
                Ok(())
            }
            TagValue::Sequence(_) => Err(Error::IsSequence { tag }),
        }
    }

    /// Appends a freshly built child `Dataset` to `tag`'s item list,
    /// creating the `SQ` entry if `tag` is absent. Fails with
    /// [`Error::NotASequence`] if `tag` exists with a non-`SQ` value.
    pub fn append_sequence_item(&self, tag: Tag) -> Result<Dataset> {
        let child = self.new_child();
        let guard = self.inner.tree.lock();
        let mut map = guard.borrow_mut();
        let occurrences = map.entry(tag.group()).or_insert_with(|| vec![BTreeMap::new()]);
        if occurrences.is_empty() {
            occurrences.push(BTreeMap::new());
        }
        let occ0 = &mut occurrences[0];
        let entry = occ0
            .entry(tag.element())
            .or_insert_with(|| TagEntry { vr: VR::SQ, value: TagValue::Sequence(Vec::new()) });
        match &mut entry.value {
            TagValue::Sequence(items) => {
                items.push(child.clone());
                Ok(child)
            }
            TagValue::Buffers(_) => Err(Error::NotASequence { tag }),
        }
    }

    /// The child dataset at `tag`'s item `index`.
    pub fn get_sequence_item(&self, tag: Tag, index: usize) -> Result<Dataset> {
        match self.lookup(tag)?.value {
            TagValue::Sequence(items) => items.get(index).cloned().ok_or(Error::MissingTag { tag }),
            TagValue::Buffers(_) => Err(Error::NotASequence { tag }),
        }
    }

    /// The number of items in the sequence at `tag`.
    pub fn sequence_len(&self, tag: Tag) -> Result<usize> {
        match self.lookup(tag)?.value {
            TagValue::Sequence(items) => Ok(items.len()),
            TagValue::Buffers(_) => Err(Error::NotASequence { tag }),
        }
    }

    /// Every `(tag, vr)` pair in occurrence 0, in `(group, element)` order.
    /// Used by the stream codec to serialize a dataset without needing to
    /// know its tags in advance.
    pub fn iter_tags(&self) -> Vec<(Tag, VR)> {
        let guard = self.inner.tree.lock();
        let map = guard.borrow();
        map.iter()
            .flat_map(|(&group, occurrences)| {
                occurrences.first().into_iter().flat_map(move |occ0| {
                    occ0.iter().map(move |(&element, entry)| (Tag(group, element), entry.vr))
                })
            })
            .collect()
    }

    fn buffer0(&self, tag: Tag) -> Result<Arc<Buffer>> {
        self.get_buffer(tag, 0)
    }

    /// Reads the value at `index` as a string.
    pub fn get_string(&self, tag: Tag, index: usize) -> Result<String> {
        let buf = self.buffer0(tag)?;
        let handler = buf.get_reading_handler(&self.charsets_list(), &self.charset_collector())?;
        Ok(handler.get_string(index)?.into_owned())
    }

    /// Like [`get_string`](Dataset::get_string), but returns `default`
    /// instead of failing on `MissingTag`/`MissingGroup`.
    pub fn get_string_default(&self, tag: Tag, index: usize, default: &str) -> Result<String> {
        match self.get_string(tag, index) {
            Ok(v) => Ok(v),
            Err(Error::MissingTag { .. }) | Err(Error::MissingGroup { .. }) => Ok(default.to_string()),
            Err(e) => Err(e),
        }
    }

    pub fn get_int(&self, tag: Tag, index: usize) -> Result<i64> {
        let buf = self.buffer0(tag)?;
        let handler = buf.get_reading_handler(&self.charsets_list(), &self.charset_collector())?;
        Ok(handler.get_int(index)?)
    }

    pub fn get_int_default(&self, tag: Tag, index: usize, default: i64) -> Result<i64> {
        match self.get_int(tag, index) {
            Ok(v) => Ok(v),
            Err(Error::MissingTag { .. }) | Err(Error::MissingGroup { .. }) => Ok(default),
            Err(e) => Err(e),
        }
    }

    pub fn get_double(&self, tag: Tag, index: usize) -> Result<f64> {
        let buf = self.buffer0(tag)?;
        let handler = buf.get_reading_handler(&self.charsets_list(), &self.charset_collector())?;
        Ok(handler.get_double(index)?)
    }

    pub fn get_double_default(&self, tag: Tag, index: usize, default: f64) -> Result<f64> {
        match self.get_double(tag, index) {
            Ok(v) => Ok(v),
            Err(Error::MissingTag { .. }) | Err(Error::MissingGroup { .. }) => Ok(default),
            Err(e) => Err(e),
        }
    }

    fn datetime_handler(&self, tag: Tag, index: usize) -> Result<DateTimeReadingHandler> {
        let buf = self.buffer0(tag)?;
        let raw = buf.get_raw_reading_handler()?;
        let _ = index;
        Ok(DateTimeReadingHandler::new(tag, raw.vr(), Memory::from_slice(raw.bytes()))?)
    }

    pub fn get_date(&self, tag: Tag, index: usize) -> Result<DicomDate> {
        Ok(self.datetime_handler(tag, index)?.get_date(index)?)
    }

    pub fn get_time(&self, tag: Tag, index: usize) -> Result<DicomTime> {
        Ok(self.datetime_handler(tag, index)?.get_time(index)?.0)
    }

    pub fn get_datetime(&self, tag: Tag, index: usize) -> Result<DicomDateTime> {
        Ok(self.datetime_handler(tag, index)?.get_datetime(index)?)
    }

    /// Reads an `AS` value as `{value, unit}`.
    pub fn get_age(&self, tag: Tag, index: usize) -> Result<DicomAge> {
        Ok(self.datetime_handler(tag, index)?.get_age(index)?)
    }

    /// `getAge(...).value` converted to fractional years, per spec §8
    /// scenario C (`"004M"` → `1/3`).
    pub fn get_age_years(&self, tag: Tag, index: usize) -> Result<f64> {
        let age = self.get_age(tag, index)?;
        let years = match age.unit {
            rsdcm_encoding::handler::datetime::AgeUnit::Days => age.value as f64 / 365.0,
            rsdcm_encoding::handler::datetime::AgeUnit::Weeks => age.value as f64 * 7.0 / 365.0,
            rsdcm_encoding::handler::datetime::AgeUnit::Months => age.value as f64 / 12.0,
            rsdcm_encoding::handler::datetime::AgeUnit::Years => age.value as f64,
        };
        Ok(years)
    }

    /// Splits a `PN` value at `index` into its alphabetic/ideographic/
    /// phonetic groups.
    pub fn get_person_name_groups(&self, tag: Tag, index: usize) -> Result<PersonNameGroups> {
        let buf = self.buffer0(tag)?;
        Ok(buf.get_person_name_groups(index, &self.charsets_list(), &self.charset_collector())?)
    }

    /// Writes `values` as `tag`'s buffer 0, creating the tag with `vr_hint`
    /// (or the dictionary's canonical VR) if absent.
    fn write_values<F>(&self, tag: Tag, dict: &dyn DicomDict, vr_hint: Option<VR>, count: usize, mut f: F) -> Result<()>
    where
        F: FnMut(&mut dyn WritingHandler, usize) -> rsdcm_encoding::Result<()>,
    {
        self.get_or_create_tag(tag, vr_hint, dict)?;
        let buf = self.buffer0(tag)?;
        let mut handler = buf.get_writing_handler(&self.charsets_list(), &self.charset_collector())?;
        handler.set_size(count);
        for index in 0..count {
            if let Err(e) = f(handler.as_mut(), index) {
                buf.release_writing_handler();
                return Err(e.into());
            }
        }
        if let Err(e) = handler.validate() {
            buf.release_writing_handler();
            return Err(e.into());
        }
        match handler.finish() {
            Ok(bytes) => {
                buf.commit_written(bytes)?;
                Ok(())
            }
            Err(e) => {
                buf.release_writing_handler();
                Err(e.into())
            }
        }
    }

    pub fn set_string(&self, tag: Tag, value: &str, dict: &dyn DicomDict) -> Result<()> {
        self.write_values(tag, dict, None, 1, |h, _| h.set_string(0, value))
    }

    /// Writes a multi-valued string (`\`-separated on the wire).
    pub fn set_strings(&self, tag: Tag, values: &[&str], dict: &dyn DicomDict) -> Result<()> {
        self.write_values(tag, dict, None, values.len(), |h, i| h.set_string(i, values[i]))
    }

    pub fn set_int(&self, tag: Tag, value: i64, dict: &dyn DicomDict) -> Result<()> {
        self.write_values(tag, dict, None, 1, |h, _| h.set_int(0, value))
    }

    pub fn set_double(&self, tag: Tag, value: f64, dict: &dyn DicomDict) -> Result<()> {
        self.write_values(tag, dict, None, 1, |h, _| h.set_double(0, value))
    }

    pub fn set_date(&self, tag: Tag, date: DicomDate, dict: &dyn DicomDict) -> Result<()> {
        let formatted = format_da(&date);
        self.write_values(tag, dict, Some(VR::DA), 1, move |h, _| h.set_string(0, &formatted))
    }

    pub fn set_time(&self, tag: Tag, time: DicomTime, dict: &dyn DicomDict) -> Result<()> {
        let formatted = format_tm(&time);
        self.write_values(tag, dict, Some(VR::TM), 1, move |h, _| h.set_string(0, &formatted))
    }

    pub fn set_datetime(&self, tag: Tag, dt: DicomDateTime, dict: &dyn DicomDict) -> Result<()> {
        let formatted = format_dt(&dt);
        self.write_values(tag, dict, Some(VR::DT), 1, move |h, _| h.set_string(0, &formatted))
    }

    pub fn set_age(&self, tag: Tag, age: DicomAge, dict: &dyn DicomDict) -> Result<()> {
        let formatted = format_as(&age);
        self.write_values(tag, dict, Some(VR::AS), 1, move |h, _| h.set_string(0, &formatted))
    }

    /// Writes a `PN` value by joining the three groups back around `=`.
    pub fn set_person_name_groups(&self, tag: Tag, groups: &PersonNameGroups, dict: &dyn DicomDict) -> Result<()> {
        let joined = rsdcm_encoding::handler::person_name::join(groups);
        self.write_values(tag, dict, Some(VR::PN), 1, move |h, _| h.set_string(0, &joined))
    }

    /// Builds a [`Lut`] from the `lutIndex`-th item of the `SQ` tag `tag`
    /// (e.g. Modality LUT Sequence `(0028,3000)` or VOI LUT Sequence
    /// `(0028,3010)`), reading that item's three fixed sub-tags: LUT
    /// Descriptor `(0028,3002)`, LUT Data `(0028,3006)`, and the optional
    /// LUT Explanation `(0028,3003)` (spec §4.4, "getLUT"). This builds the
    /// data object only; applying it to pixels is the external Transforms
    /// collaborator's job (spec §1, out of scope here).
    pub fn get_lut(&self, tag: Tag, lut_index: usize) -> Result<Lut> {
        let item = self.get_sequence_item(tag, lut_index)?;
        let descriptor_buf = item.buffer0(TAG_LUT_DESCRIPTOR)?;
        let descriptor_handler = descriptor_buf.get_reading_handler(&item.charsets_list(), &item.charset_collector())?;
        if descriptor_handler.len() < 3 {
            return Err(Error::CorruptedFile {
                tag: TAG_LUT_DESCRIPTOR,
                reason: "LUT Descriptor must have 3 values".to_string(),
            });
        }
        let number_of_entries = descriptor_handler.get_int(0)?;
        let first_input_value = descriptor_handler.get_int(1)?;
        let bits_per_entry = descriptor_handler.get_int(2)?;

        let data_buf = item.buffer0(TAG_LUT_DATA)?;
        let data_handler = data_buf.get_reading_handler(&item.charsets_list(), &item.charset_collector())?;
        // A descriptor of 0 entries is the DICOM convention for 65536
        // (the count doesn't fit in the 16-bit US descriptor field).
        let count = if number_of_entries == 0 { 65536 } else { number_of_entries as usize };
        let mut data = Vec::with_capacity(count.min(data_handler.len()));
        for i in 0..count.min(data_handler.len()) {
            data.push(data_handler.get_int(i)?);
        }

        let explanation = item.get_string(TAG_LUT_EXPLANATION, 0).ok();

        Ok(Lut { number_of_entries, first_input_value, bits_per_entry, data, explanation })
    }
}

/// `(0028,3002)` LUT Descriptor: `{numberOfEntries, firstInputValue,
/// bitsPerEntry}`, shared by the Modality LUT, VOI LUT, and Palette Color
/// LUT sequence items.
const TAG_LUT_DESCRIPTOR: Tag = Tag(0x0028, 0x3002);
/// `(0028,3003)` LUT Explanation, a free-text `LO` description.
const TAG_LUT_EXPLANATION: Tag = Tag(0x0028, 0x3003);
/// `(0028,3006)` LUT Data: one integer per table entry.
const TAG_LUT_DATA: Tag = Tag(0x0028, 0x3006);

/// A lookup table read out of a Modality/VOI LUT sequence item (spec §4.4,
/// §3 "Image"). Purely a data object: applying it to pixel samples belongs
/// to the external Transforms collaborator (spec §1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lut {
    pub number_of_entries: i64,
    pub first_input_value: i64,
    pub bits_per_entry: i64,
    pub data: Vec<i64>,
    pub explanation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsdcm_core::header::Tag;
    use rsdcm_dictionary_std::StandardDataDictionary;

    fn dict() -> StandardDataDictionary {
        StandardDataDictionary
    }

    #[test]
    fn set_then_get_string_round_trips() {
        let ds = Dataset::new();
        let tag = Tag(0x0008, 0x0060); // Modality
        ds.set_string(tag, "CT", &dict()).unwrap();
        assert_eq!(ds.get_string(tag, 0).unwrap(), "CT");
    }

    #[test]
    fn missing_tag_is_distinguishable_from_missing_group() {
        let ds = Dataset::new();
        assert!(matches!(ds.get_string(Tag(0x0010, 0x0010), 0), Err(Error::MissingGroup { .. })));
        ds.set_string(Tag(0x0010, 0x0020), "1", &dict()).unwrap();
        assert!(matches!(ds.get_string(Tag(0x0010, 0x0099), 0), Err(Error::MissingTag { .. })));
    }

    #[test]
    fn get_string_default_only_catches_missing() {
        let ds = Dataset::new();
        let tag = Tag(0x0008, 0x0060);
        assert_eq!(ds.get_string_default(tag, 0, "OT").unwrap(), "OT");
    }

    #[test]
    fn sequence_items_round_trip() {
        let ds = Dataset::new();
        let tag = Tag(0x0008, 0x1140); // Referenced Image Sequence
        let item = ds.append_sequence_item(tag).unwrap();
        item.set_string(Tag(0x0008, 0x1150), "1.2.3", &dict()).unwrap();
        assert_eq!(ds.sequence_len(tag).unwrap(), 1);
        let fetched = ds.get_sequence_item(tag, 0).unwrap();
        assert_eq!(fetched.get_string(Tag(0x0008, 0x1150), 0).unwrap(), "1.2.3");
    }

    #[test]
    fn sequence_item_inherits_charsets_and_transfer_syntax() {
        let ds = Dataset::new();
        ds.set_transfer_syntax("1.2.840.10008.1.2");
        ds.set_charsets_list(vec!["ISO_IR 100".to_string()]);
        let item = ds.append_sequence_item(Tag(0x0008, 0x1140)).unwrap();
        assert_eq!(item.transfer_syntax(), "1.2.840.10008.1.2");
        assert_eq!(item.charsets_list(), vec!["ISO_IR 100".to_string()]);
    }

    #[test]
    fn age_round_trips_to_years() {
        let ds = Dataset::new();
        let tag = Tag(0x0010, 0x1010);
        ds.set_string(Tag(0x0010, 0x1010), "025Y", &dict()).unwrap();
        // set_string bypasses AS validation (VR defaults to dictionary's AS
        // for this tag, so the DateTimeWritingHandler still validates it).
        let age = ds.get_age(tag, 0).unwrap();
        assert_eq!(age.value, 25);
        assert_eq!(ds.get_age_years(tag, 0).unwrap(), 25.0);

        ds.set_string(Tag(0x0010, 0x1010), "004M", &dict()).unwrap();
        let years = ds.get_age_years(tag, 0).unwrap();
        assert!((years - (1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn person_name_groups_round_trip() {
        let ds = Dataset::new();
        let tag = Tag(0x0010, 0x0010);
        ds.set_string(tag, "Doe^John", &dict()).unwrap();
        let groups = ds.get_person_name_groups(tag, 0).unwrap();
        assert_eq!(groups.alphabetic, "Doe^John");
        assert_eq!(groups.phonetic, "");
    }

    #[test]
    fn not_a_sequence_when_buffers_present() {
        let ds = Dataset::new();
        let tag = Tag(0x0008, 0x0060);
        ds.set_string(tag, "CT", &dict()).unwrap();
        assert!(matches!(ds.append_sequence_item(tag), Err(Error::NotASequence { .. })));
    }

    #[test]
    fn pixel_data_fragments_append_in_order() {
        let ds = Dataset::new();
        let tag = rsdcm_core::header::PIXEL_DATA;
        ds.get_or_create_tag(tag, Some(VR::OB), &dict()).unwrap();
        ds.push_fragment(tag, Memory::from_slice(&[1, 2])).unwrap();
        ds.push_fragment(tag, Memory::from_slice(&[3, 4])).unwrap();
        assert_eq!(ds.buffer_count(tag).unwrap(), 3); // empty BOT + 2 fragments
        let handler = ds.get_buffer(tag, 2).unwrap().get_raw_reading_handler().unwrap();
        assert_eq!(handler.bytes(), &[3, 4]);
    }

    #[test]
    fn concurrent_reads_see_consistent_values() {
        use std::thread;
        let ds = Dataset::new();
        for i in 0..16u16 {
            ds.set_string(Tag(0x0009, i), &format!("v{i}"), &dict()).unwrap();
        }
        let ds = Arc::new(ds);
        let mut handles = Vec::new();
        for _ in 0..4 {
            let ds = ds.clone();
            handles.push(thread::spawn(move || {
                for i in 0..16u16 {
                    assert_eq!(ds.get_string(Tag(0x0009, i), 0).unwrap(), format!("v{i}"));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn get_lut_reads_descriptor_data_and_explanation() {
        let ds = Dataset::new();
        let tag = Tag(0x0028, 0x3010); // VOI LUT Sequence
        let item = ds.append_sequence_item(tag).unwrap();
        item.write_values(TAG_LUT_DESCRIPTOR, &dict(), None, 3, |h, i| h.set_int(i, [4i64, 0, 16][i]))
            .unwrap();
        item.write_values(TAG_LUT_DATA, &dict(), None, 4, |h, i| h.set_int(i, [10i64, 20, 30, 40][i]))
            .unwrap();
        item.set_string(TAG_LUT_EXPLANATION, "identity", &dict()).unwrap();

        let lut = ds.get_lut(tag, 0).unwrap();
        assert_eq!(lut.number_of_entries, 4);
        assert_eq!(lut.first_input_value, 0);
        assert_eq!(lut.bits_per_entry, 16);
        assert_eq!(lut.data, vec![10, 20, 30, 40]);
        assert_eq!(lut.explanation.as_deref(), Some("identity"));
    }

    #[test]
    fn get_lut_zero_entries_means_65536() {
        let ds = Dataset::new();
        let tag = Tag(0x0028, 0x3000); // Modality LUT Sequence
        let item = ds.append_sequence_item(tag).unwrap();
        item.write_values(TAG_LUT_DESCRIPTOR, &dict(), None, 3, |h, i| h.set_int(i, [0i64, 0, 16][i]))
            .unwrap();
        item.write_values(TAG_LUT_DATA, &dict(), None, 2, |h, i| h.set_int(i, [1i64, 2][i]))
            .unwrap();

        let lut = ds.get_lut(tag, 0).unwrap();
        assert_eq!(lut.number_of_entries, 0);
        // Only as many entries as LUT Data actually carries are returned,
        // even though a zero descriptor nominally means 65536.
        assert_eq!(lut.data, vec![1, 2]);
        assert_eq!(lut.explanation, None);
    }
}
