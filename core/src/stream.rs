//! [`StreamView`]: a bounded, seekable-or-sequential window over an external
//! byte stream, plus the bit-level reader built on top of it for JPEG
//! entropy decoding (spec §4.1).
//!
//! The core library does not implement file I/O itself (spec §1 names
//! `stream` abstractions as an external collaborator); `StreamView` is the
//! seam at which any `Read`/`Read + Seek` source is adapted into the shape
//! the rest of the pipeline needs: cooperative cancellation, forward-only
//! skipping when the source isn't seekable, and cheap sub-windowing so a
//! nested element (an SQ item, a JPEG scan) can be handed a view that can't
//! read past its own bounds.

use crate::error::{self, Result};
use parking_lot::Mutex;
use snafu::ResultExt;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Byte order, the two kinds considered by the DICOM standard.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Endianness {
    /// Little Endian.
    LE,
    /// Big Endian.
    BE,
}

impl Endianness {
    /// This host's native byte order.
    #[cfg(target_endian = "little")]
    pub fn native() -> Endianness {
        Endianness::LE
    }

    /// This host's native byte order.
    #[cfg(target_endian = "big")]
    pub fn native() -> Endianness {
        Endianness::BE
    }
}

/// Byte-swaps `buf` in place, word by word, when `desired` differs from the
/// host's native order. `word_size` must be one of `1, 2, 4, 8`; a
/// `word_size` of `1` is always a no-op.
///
/// This is the `adjustEndian` helper named in spec §4.1, used both by
/// deferred [`Buffer`](https://docs.rs/rsdcm-encoding) materialization and
/// by numeric value handlers reading multi-byte samples.
pub fn adjust_endian(buf: &mut [u8], word_size: usize, desired: Endianness) {
    if word_size <= 1 || desired == Endianness::native() {
        return;
    }
    debug_assert!(buf.len() % word_size == 0);
    for word in buf.chunks_mut(word_size) {
        word.reverse();
    }
}

trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

enum Source {
    /// A source that supports absolute seeking. `base` is the offset (in
    /// the underlying source) that corresponds to position `0` of this
    /// view.
    Seekable { source: Arc<Mutex<dyn ReadSeek>>, base: u64 },
    /// A source that can only be read forward. Sub-windows of a sequential
    /// source share position bookkeeping through the same mutex, so a
    /// fragment view and its parent cannot be read concurrently — the
    /// owner must finish with one before advancing the other.
    Sequential(Arc<Mutex<dyn Read + Send>>),
}

/// A bounded or unbounded window over a byte stream.
///
/// Cloning a `StreamView` is cheap (an `Arc` bump) and produces a view that
/// shares the same cancellation flag and, for seekable sources, the same
/// underlying cursor.
#[derive(Clone)]
pub struct StreamView {
    source: Arc<SourceCell>,
    /// Start of this view, relative to its source's position space.
    start: u64,
    /// Current read position, relative to `start`.
    position: u64,
    /// Upper bound on this view's length, if bounded.
    length: Option<u64>,
    terminated: Arc<AtomicBool>,
}

struct SourceCell(Source);

impl StreamView {
    /// Builds a view over a seekable source. `length` bounds the view if
    /// given; otherwise the view extends to the source's end.
    pub fn new_seekable<S>(source: S, length: Option<u64>) -> Result<Self>
    where
        S: Read + Seek + Send + 'static,
    {
        Ok(StreamView {
            source: Arc::new(SourceCell(Source::Seekable {
                source: Arc::new(Mutex::new(source)),
                base: 0,
            })),
            start: 0,
            position: 0,
            length,
            terminated: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Builds a view over a forward-only source.
    pub fn new_sequential<S>(source: S, length: Option<u64>) -> Self
    where
        S: Read + Send + 'static,
    {
        StreamView {
            source: Arc::new(SourceCell(Source::Sequential(Arc::new(Mutex::new(source))))),
            start: 0,
            position: 0,
            length,
            terminated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether this view supports [`seek`](StreamView::seek).
    pub fn is_seekable(&self) -> bool {
        matches!(self.source.0, Source::Seekable { .. })
    }

    /// The view's current position, relative to its own start.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// The view's declared length, if it is a bounded window.
    pub fn virtual_length(&self) -> Option<u64> {
        self.length
    }

    /// Whether the view has been read to its declared end. Always `false`
    /// for an unbounded view over a still-open source.
    pub fn end_reached(&self) -> bool {
        match self.length {
            Some(len) => self.position >= len,
            None => false,
        }
    }

    /// Forces all subsequent reads on this view (and any clone sharing its
    /// cancellation flag) to fail with [`Error::StreamClosed`].
    ///
    /// [`Error::StreamClosed`]: crate::error::Error::StreamClosed
    pub fn terminate(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    fn check_open(&self) -> Result<()> {
        if self.terminated.load(Ordering::SeqCst) {
            error::StreamClosedSnafu.fail()
        } else {
            Ok(())
        }
    }

    fn remaining(&self) -> Option<u64> {
        self.length.map(|len| len.saturating_sub(self.position))
    }

    /// Reads into `buf`, returning the number of bytes actually read (which
    /// may be less than `buf.len()` on a short read, including `0` at the
    /// view's bound).
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        let buf = if let Some(remaining) = self.remaining() {
            let cap = (remaining as usize).min(buf.len());
            &mut buf[..cap]
        } else {
            buf
        };
        if buf.is_empty() {
            return Ok(0);
        }
        let n = match &self.source.0 {
            Source::Seekable { source, base } => {
                let mut guard = source.lock();
                guard
                    .seek(SeekFrom::Start(base + self.start + self.position))
                    .map_err(io_err)?;
                guard.read(buf).map_err(io_err)?
            }
            Source::Sequential(source) => source.lock().read(buf).map_err(io_err)?,
        };
        self.position += n as u64;
        Ok(n)
    }

    /// Reads exactly `buf.len()` bytes, failing with
    /// [`Error::StreamEof`](crate::error::Error::StreamEof) on a short read.
    pub fn read_fully(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                return error::StreamEofSnafu { expected: buf.len(), got: filled }.fail();
            }
            filled += n;
        }
        Ok(())
    }

    /// Advances the view by `n` bytes without returning them. Works on both
    /// seekable and sequential sources, reading-and-discarding on the
    /// latter. Returns the number of bytes actually skipped.
    pub fn skip(&mut self, n: u64) -> Result<u64> {
        self.check_open()?;
        match &self.source.0 {
            Source::Seekable { .. } => {
                let remaining = self.remaining().unwrap_or(u64::MAX);
                let n = n.min(remaining);
                self.position += n;
                Ok(n)
            }
            Source::Sequential(_) => {
                let mut scratch = [0u8; 4096];
                let mut left = n.min(self.remaining().unwrap_or(u64::MAX));
                let mut total = 0u64;
                while left > 0 {
                    let chunk = (left as usize).min(scratch.len());
                    let got = self.read(&mut scratch[..chunk])?;
                    if got == 0 {
                        break;
                    }
                    total += got as u64;
                    left -= got as u64;
                }
                Ok(total)
            }
        }
    }

    /// Seeks to an absolute position within this view. Fails with
    /// [`Error::StreamNotSeekable`](crate::error::Error::StreamNotSeekable)
    /// if the underlying source cannot seek.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        self.check_open()?;
        if !self.is_seekable() {
            return error::StreamNotSeekableSnafu.fail();
        }
        self.position = pos;
        Ok(())
    }

    /// Produces a sub-window `[start, start+length)` of this view. Reads and
    /// seeks on the returned view operate in the sub-window's own
    /// coordinate system and cannot escape `[start, start+length)`.
    ///
    /// For a sequential source this only makes sense relative to the
    /// current read position; `start` must therefore be `0`.
    pub fn window(&self, start: u64, length: u64) -> Result<StreamView> {
        if !self.is_seekable() && start != 0 {
            return error::StreamNotSeekableSnafu.fail();
        }
        let new_start = self.start + self.position + start;
        let source = match &self.source.0 {
            Source::Seekable { source, base } => {
                Arc::new(SourceCell(Source::Seekable { source: source.clone(), base: *base }))
            }
            Source::Sequential(source) => Arc::new(SourceCell(Source::Sequential(source.clone()))),
        };
        Ok(StreamView {
            source,
            start: new_start,
            position: 0,
            length: Some(length),
            terminated: self.terminated.clone(),
        })
    }
}

impl std::fmt::Debug for StreamView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamView")
            .field("start", &self.start)
            .field("position", &self.position)
            .field("length", &self.length)
            .field("seekable", &self.is_seekable())
            .finish()
    }
}

fn io_err(e: io::Error) -> error::Error {
    // A closed/reset pipe surfaces the same way a deliberate `terminate()`
    // call does: subsequent reads see `StreamClosed`.
    if e.kind() == io::ErrorKind::BrokenPipe || e.kind() == io::ErrorKind::ConnectionAborted {
        error::Error::StreamClosed
    } else {
        error::Error::StreamEof { expected: 0, got: 0 }
    }
}

/// A bit-level reader over a [`StreamView`], used by the JPEG entropy coder.
///
/// Honors JPEG byte stuffing: a `0xFF` byte in the entropy stream is always
/// followed by a stuffing `0x00`, which is consumed and never surfaced to
/// the caller. A non-zero follower is a marker; [`BitReader::align_to_byte`]
/// detects this and fails rather than silently consuming part of a marker.
pub struct BitReader<'s> {
    stream: &'s mut StreamView,
    bit_buffer: u32,
    bits_available: u32,
    marker_pending: Option<u8>,
}

impl<'s> BitReader<'s> {
    /// Wraps a stream view for bit-level reading.
    pub fn new(stream: &'s mut StreamView) -> Self {
        BitReader { stream, bit_buffer: 0, bits_available: 0, marker_pending: None }
    }

    /// The marker byte observed after a stuffed `0xFF`, if any, left behind
    /// by the last fill that hit one. The caller (the scan decoder) is
    /// expected to consume this before requesting more entropy bits.
    pub fn pending_marker(&self) -> Option<u8> {
        self.marker_pending
    }

    fn fill_byte(&mut self) -> Result<()> {
        let mut byte = [0u8; 1];
        self.stream.read_fully(&mut byte)?;
        if byte[0] == 0xFF {
            let mut follower = [0u8; 1];
            self.stream.read_fully(&mut follower)?;
            if follower[0] != 0x00 {
                self.marker_pending = Some(follower[0]);
                return error::CorruptedBufferSnafu {
                    tag: crate::header::Tag(0x7FE0, 0x0010),
                    reason: "marker in entropy stream".to_string(),
                }
                .fail();
            }
        }
        self.bit_buffer = (self.bit_buffer << 8) | byte[0] as u32;
        self.bits_available += 8;
        Ok(())
    }

    /// Reads a single bit, most significant bit first.
    pub fn read_bit(&mut self) -> Result<u32> {
        self.read_bits(1)
    }

    /// Reads up to 32 bits, most significant bit first.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        debug_assert!(n <= 32);
        while self.bits_available < n {
            self.fill_byte()?;
        }
        let shift = self.bits_available - n;
        let mask = if n == 32 { u32::MAX } else { (1u32 << n) - 1 };
        let value = (self.bit_buffer >> shift) & mask;
        self.bits_available -= n;
        self.bit_buffer &= if self.bits_available == 32 { u32::MAX } else { (1u32 << self.bits_available) - 1 };
        Ok(value)
    }

    /// Discards any partial byte so the next read starts at a byte
    /// boundary. Any bits already buffered but unread are dropped, matching
    /// JPEG restart-marker alignment semantics.
    pub fn align_to_byte(&mut self) {
        self.bits_available = 0;
        self.bit_buffer = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn seekable_window_cannot_read_past_bound() {
        let data = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
        let view = StreamView::new_seekable(Cursor::new(data), None).unwrap();
        let mut sub = view.window(2, 3).unwrap();
        let mut buf = [0u8; 8];
        let n = sub.read(&mut buf).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf[..3], &[3, 4, 5]);
        assert!(sub.end_reached());
    }

    #[test]
    fn terminate_fails_subsequent_reads() {
        let view = StreamView::new_seekable(Cursor::new(vec![1, 2, 3]), None).unwrap();
        let mut clone = view.clone();
        view.terminate();
        let mut buf = [0u8; 1];
        assert!(matches!(clone.read(&mut buf), Err(error::Error::StreamClosed)));
    }

    #[test]
    fn adjust_endian_swaps_words_only_when_needed() {
        let mut buf = [0x01, 0x00, 0x02, 0x00];
        adjust_endian(&mut buf, 2, Endianness::native());
        assert_eq!(buf, [0x01, 0x00, 0x02, 0x00]);
        let other = if Endianness::native() == Endianness::LE { Endianness::BE } else { Endianness::LE };
        adjust_endian(&mut buf, 2, other);
        assert_eq!(buf, [0x00, 0x01, 0x00, 0x02]);
    }

    #[test]
    fn bit_reader_unstuffs_ff00() {
        let data = vec![0xFFu8, 0x00, 0b1010_0000];
        let mut view = StreamView::new_seekable(Cursor::new(data), None).unwrap();
        let mut reader = BitReader::new(&mut view);
        assert_eq!(reader.read_bits(8).unwrap(), 0xFF);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
    }
}
