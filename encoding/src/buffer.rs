//! `Buffer`: the storage behind one tag's value (spec §4.2).
//!
//! A buffer starts life in one of two states:
//!
//! - **deferred**: backed by a [`StreamView`] window into the source file,
//!   not yet read. Materialization happens lazily, on first access that
//!   actually needs the bytes, and applies the endian swap recorded at
//!   parse time (spec §4.1's `adjustEndian`).
//! - **resident**: an ordered rope of [`Memory`] blocks, built up by
//!   [`Buffer::append_memory`] (e.g. while reassembling encapsulated
//!   pixel-data fragments) and collapsed to one block by
//!   [`Buffer::commit`].
//!
//! Access is serialized through a single [`parking_lot::Mutex`], taken after
//! any owning `Dataset` lock per the fixed lock order in spec §5.

use crate::error::{self, Result};
use crate::handler::{
    datetime::DateTimeReadingHandler,
    datetime::DateTimeWritingHandler,
    numeric::{NumericReadingHandler, NumericWritingHandler},
    person_name,
    string::{StringReadingHandler, StringWritingHandler},
    unicode::{UnicodeReadingHandler, UnicodeWritingHandler},
    ReadingHandler, WritingHandler,
};
use parking_lot::Mutex;
use rsdcm_core::charset::CharsetCollector;
use rsdcm_core::header::{Tag, VR};
use rsdcm_core::memory::Memory;
use rsdcm_core::stream::{adjust_endian, Endianness, StreamView};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

enum State {
    Deferred { stream: StreamView, word_size: usize, byte_order: Endianness },
    Resident { blocks: Vec<Memory> },
}

/// The per-tag value store. One `Buffer` backs one [`ReadingHandler`]/
/// [`WritingHandler`] family at a time; `vr` never changes once the buffer
/// is constructed (changing a tag's VR means replacing its buffer).
#[derive(Debug)]
pub struct Buffer {
    tag: Tag,
    vr: VR,
    state: Mutex<State>,
    writing_in_progress: AtomicBool,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Deferred { word_size, byte_order, .. } => f
                .debug_struct("Deferred")
                .field("word_size", word_size)
                .field("byte_order", byte_order)
                .finish(),
            State::Resident { blocks } => {
                f.debug_struct("Resident").field("blocks", &blocks.len()).finish()
            }
        }
    }
}

impl Buffer {
    /// Builds a buffer already holding its bytes in memory.
    pub fn new_resident(tag: Tag, vr: VR, memory: Memory) -> Self {
        Buffer {
            tag,
            vr,
            state: Mutex::new(State::Resident { blocks: vec![memory] }),
            writing_in_progress: AtomicBool::new(false),
        }
    }

    /// Builds a buffer that defers reading its bytes until first access.
    /// `word_size` and `byte_order` describe how the bytes were encoded on
    /// the wire, so materialization can restore host-native order.
    pub fn new_deferred(tag: Tag, vr: VR, stream: StreamView, word_size: usize, byte_order: Endianness) -> Self {
        Buffer {
            tag,
            vr,
            state: Mutex::new(State::Deferred { stream, word_size, byte_order }),
            writing_in_progress: AtomicBool::new(false),
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn vr(&self) -> VR {
        self.vr
    }

    /// The buffer's length in bytes, without necessarily materializing a
    /// deferred buffer (a deferred stream already knows its own length).
    pub fn size_bytes(&self) -> Result<usize> {
        let state = self.state.lock();
        match &*state {
            State::Deferred { stream, .. } => Ok(stream.virtual_length().unwrap_or(0) as usize),
            State::Resident { blocks } => Ok(blocks.iter().map(|b| b.len()).sum()),
        }
    }

    fn materialize_locked(&self, state: &mut State) -> Result<()> {
        if let State::Deferred { stream, word_size, byte_order } = state {
            let len = stream.virtual_length().unwrap_or(0) as usize;
            tracing::debug!("materializing deferred buffer for {} ({} bytes)", self.tag, len);
            let mut bytes = vec![0u8; len];
            let mut cursor = stream.clone();
            cursor.read_fully(&mut bytes)?;
            adjust_endian(&mut bytes, *word_size, *byte_order);
            *state = State::Resident { blocks: vec![Memory::from_vec(bytes)] };
        }
        Ok(())
    }

    /// Forces materialization if deferred, then collapses a resident rope
    /// into a single contiguous block.
    pub fn commit(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.materialize_locked(&mut state)?;
        if let State::Resident { blocks } = &*state {
            if blocks.len() > 1 {
                let combined = Memory::concat(blocks.iter());
                *state = State::Resident { blocks: vec![combined] };
            }
        }
        Ok(())
    }

    /// Appends a block to a resident buffer's rope (materializing first if
    /// the buffer was deferred). Used while reassembling encapsulated
    /// pixel-data fragments.
    pub fn append_memory(&self, memory: Memory) -> Result<()> {
        let mut state = self.state.lock();
        self.materialize_locked(&mut state)?;
        if let State::Resident { blocks } = &mut *state {
            blocks.push(memory);
        }
        Ok(())
    }

    /// Returns the materialized bytes as one contiguous block, committing
    /// first if the rope has more than one segment.
    fn materialized_memory(&self) -> Result<Memory> {
        let mut state = self.state.lock();
        self.materialize_locked(&mut state)?;
        match &*state {
            State::Resident { blocks } => Ok(Memory::concat(blocks.iter())),
            State::Deferred { .. } => unreachable!("materialize_locked always resolves Deferred"),
        }
    }

    /// A `StreamView` over this buffer's bytes. When the buffer is still
    /// deferred and its recorded byte order already matches the host (or
    /// its word size is `1`, so no swap would ever be needed), this is a
    /// cheap clone of the underlying stream window with no copy. Otherwise
    /// the buffer is materialized first and the view wraps the resulting
    /// `Memory`.
    pub fn get_stream_reader(&self) -> Result<StreamView> {
        {
            let state = self.state.lock();
            if let State::Deferred { stream, word_size, byte_order } = &*state {
                if *word_size <= 1 || *byte_order == Endianness::native() {
                    return Ok(stream.clone());
                }
            }
        }
        let memory = self.materialized_memory()?;
        let len = memory.len() as u64;
        StreamView::new_seekable(Cursor::new(memory), Some(len)).map_err(Into::into)
    }

    /// Whether a `WritingHandler` is currently checked out against this
    /// buffer and not yet resolved via [`commit_written`](Buffer::commit_written)
    /// or [`release_writing_handler`](Buffer::release_writing_handler).
    pub fn is_writing_in_progress(&self) -> bool {
        self.writing_in_progress.load(Ordering::Acquire)
    }

    fn begin_writing(&self) -> Result<()> {
        if self.writing_in_progress.swap(true, Ordering::AcqRel) {
            return error::BufferBusySnafu { tag: self.tag }.fail();
        }
        Ok(())
    }

    /// Abandons an in-flight `WritingHandler` without publishing anything,
    /// clearing the busy flag so a new one can be requested.
    pub fn release_writing_handler(&self) {
        self.writing_in_progress.store(false, Ordering::Release);
    }

    /// Publishes bytes produced by a `WritingHandler::finish` call,
    /// replacing this buffer's content and clearing the busy flag.
    pub fn commit_written(&self, bytes: Vec<u8>) -> Result<()> {
        let mut state = self.state.lock();
        *state = State::Resident { blocks: vec![Memory::from_vec(bytes)] };
        self.writing_in_progress.store(false, Ordering::Release);
        Ok(())
    }

    /// Builds the appropriate [`ReadingHandler`] for this buffer's VR.
    /// Fails with `InvalidHandlerForSequence` for `SQ` (sequences have no
    /// buffer; their content lives in child datasets).
    pub fn get_reading_handler(
        &self,
        charsets_list: &[String],
        collector: &Arc<dyn CharsetCollector>,
    ) -> Result<Box<dyn ReadingHandler>> {
        if self.vr == VR::SQ {
            return error::InvalidHandlerForSequenceSnafu { tag: self.tag }.fail();
        }
        let memory = self.materialized_memory()?;
        Ok(match self.vr {
            VR::AE | VR::CS | VR::DS | VR::IS | VR::UI | VR::UR => {
                Box::new(StringReadingHandler::new(self.tag, self.vr, memory)?)
            }
            VR::LO | VR::LT | VR::PN | VR::SH | VR::ST | VR::UC | VR::UT => {
                Box::new(UnicodeReadingHandler::new(self.tag, self.vr, memory, charsets_list, collector))
            }
            VR::DA | VR::TM | VR::DT | VR::AS => {
                Box::new(DateTimeReadingHandler::new(self.tag, self.vr, memory)?)
            }
            // FL, FD, SS, US, SL, UL, OB, OW, OL, OD, OF, AT, UN.
            _ => Box::new(NumericReadingHandler::new(self.tag, self.vr, memory)),
        })
    }

    /// Builds the appropriate [`WritingHandler`] for this buffer's VR.
    /// Fails with `BufferBusy` if another writing handler is already in
    /// flight and hasn't been resolved.
    pub fn get_writing_handler(
        &self,
        charsets_list: &[String],
        collector: &Arc<dyn CharsetCollector>,
    ) -> Result<Box<dyn WritingHandler>> {
        if self.vr == VR::SQ {
            return error::InvalidHandlerForSequenceSnafu { tag: self.tag }.fail();
        }
        self.begin_writing()?;
        Ok(match self.vr {
            VR::AE | VR::CS | VR::DS | VR::IS | VR::UI | VR::UR => {
                Box::new(StringWritingHandler::new(self.tag, self.vr))
            }
            VR::LO | VR::LT | VR::PN | VR::SH | VR::ST | VR::UC | VR::UT => {
                Box::new(UnicodeWritingHandler::new(self.tag, self.vr, collector.clone(), charsets_list.to_vec()))
            }
            VR::DA | VR::TM | VR::DT | VR::AS => Box::new(DateTimeWritingHandler::new(self.tag, self.vr)),
            _ => Box::new(NumericWritingHandler::new(self.tag, self.vr)),
        })
    }

    /// A raw, VR-agnostic reading handler over this buffer's bytes. Used by
    /// the pixel-data bridge, which interprets `OB`/`OW`/`UN` bytes itself
    /// rather than through a typed handler.
    pub fn get_raw_reading_handler(&self) -> Result<RawReadingHandler> {
        let memory = self.materialized_memory()?;
        Ok(RawReadingHandler { tag: self.tag, vr: self.vr, memory })
    }

    /// A raw, VR-agnostic writing handler; `finish()` returns exactly the
    /// bytes given to it, with even-length padding applied.
    pub fn get_raw_writing_handler(&self) -> Result<RawWritingHandler> {
        self.begin_writing()?;
        Ok(RawWritingHandler { tag: self.tag, vr: self.vr, bytes: Vec::new() })
    }

    /// Splits a `PN` value at `index` into its component groups. A thin
    /// convenience over [`get_reading_handler`] for callers that only need
    /// this one thing.
    pub fn get_person_name_groups(
        &self,
        index: usize,
        charsets_list: &[String],
        collector: &Arc<dyn CharsetCollector>,
    ) -> Result<person_name::PersonNameGroups> {
        let memory = self.materialized_memory()?;
        let handler = UnicodeReadingHandler::new(self.tag, VR::PN, memory, charsets_list, collector);
        handler.get_person_name_groups(index)
    }
}

/// A VR-agnostic view over raw bytes, bypassing VR-specific splitting.
#[derive(Debug)]
pub struct RawReadingHandler {
    tag: Tag,
    vr: VR,
    memory: Memory,
}

impl RawReadingHandler {
    pub fn bytes(&self) -> &[u8] {
        self.memory.as_slice()
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn vr(&self) -> VR {
        self.vr
    }
}

/// A VR-agnostic accumulator that publishes exactly the bytes it is given.
#[derive(Debug)]
pub struct RawWritingHandler {
    tag: Tag,
    vr: VR,
    bytes: Vec<u8>,
}

impl RawWritingHandler {
    pub fn set_bytes(&mut self, bytes: Vec<u8>) {
        self.bytes = bytes;
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }
}

impl WritingHandler for RawWritingHandler {
    fn vr(&self) -> VR {
        self.vr
    }

    fn set_size(&mut self, _count: usize) {}

    fn set_string(&mut self, _index: usize, value: &str) -> Result<()> {
        self.bytes = value.as_bytes().to_vec();
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>> {
        let mut bytes = self.bytes;
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
    use std::io::Cursor as StdCursor;

    fn collector() -> Arc<dyn CharsetCollector> {
        Arc::new(IsoIr6)
    }

    #[test]
    fn resident_buffer_reads_through_string_handler() {
        let buf = Buffer::new_resident(Tag(0x0008, 0x0060), VR::CS, Memory::from_slice(b"CT"));
        let handler = buf.get_reading_handler(&[], &collector()).unwrap();
        assert_eq!(handler.get_string(0).unwrap(), "CT");
    }

    #[test]
    fn deferred_buffer_materializes_with_endian_swap() {
        let bytes = vec![0x00, 0x01]; // big-endian 0x0001
        let stream = StreamView::new_seekable(StdCursor::new(bytes), Some(2)).unwrap();
        let other = if Endianness::native() == Endianness::LE { Endianness::BE } else { Endianness::LE };
        let buf = Buffer::new_deferred(Tag(0x0028, 0x0010), VR::US, stream, 2, other);
        let handler = buf.get_reading_handler(&[], &collector()).unwrap();
        assert_eq!(handler.get_int(0).unwrap(), 1);
    }

    #[test]
    fn writing_handler_busy_until_released() {
        let buf = Buffer::new_resident(Tag(0x0008, 0x0060), VR::CS, Memory::empty());
        let _first = buf.get_writing_handler(&[], &collector()).unwrap();
        assert!(buf.get_writing_handler(&[], &collector()).is_err());
        buf.release_writing_handler();
        assert!(buf.get_writing_handler(&[], &collector()).is_ok());
    }

    #[test]
    fn commit_written_publishes_and_clears_busy() {
        let buf = Buffer::new_resident(Tag(0x0008, 0x0060), VR::CS, Memory::empty());
        let w = buf.get_writing_handler(&[], &collector()).unwrap();
        let bytes = w.finish().unwrap();
        buf.commit_written(bytes).unwrap();
        assert!(!buf.is_writing_in_progress());
    }

    #[test]
    fn append_memory_then_commit_collapses_rope() {
        let buf = Buffer::new_resident(Tag(0x7FE0, 0x0010), VR::OB, Memory::from_slice(&[1, 2]));
        buf.append_memory(Memory::from_slice(&[3, 4])).unwrap();
        assert_eq!(buf.size_bytes().unwrap(), 4);
        buf.commit().unwrap();
        let handler = buf.get_raw_reading_handler().unwrap();
        assert_eq!(handler.bytes(), &[1, 2, 3, 4]);
    }

    #[test]
    fn sequence_vr_has_no_buffer_handler() {
        let buf = Buffer::new_resident(Tag(0x0008, 0x1140), VR::SQ, Memory::empty());
        assert!(buf.get_reading_handler(&[], &collector()).is_err());
    }
}
