//! `CodecFactory`: the process-wide registry of stream and image codecs
//! (spec §4.8).
//!
//! This crate hosts the registry itself and the container-autodetection
//! logic that needs no more than the transfer syntax table; the concrete
//! `ImageCodec` implementations (JPEG, RLE, the native bit-packed codec)
//! live in `rsdcm-pixeldata`, which depends on this crate rather than the
//! other way around, and registers itself into a `CodecFactory` the caller
//! owns, keeping this crate free of any dependency on `rsdcm-pixeldata`.

use crate::error::{self, Result};
use crate::transfer_syntax::{self, CodecKind, TransferSyntax};
use parking_lot::{Mutex, RwLock};
use rsdcm_core::stream::StreamView;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Which DICOM container variant a stream begins with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// 128-byte preamble, then `DICM`, then the file-meta group.
    Preamble,
    /// No preamble: the file-meta group starts at byte 0.
    BareElement,
}

/// A minimal marker an image codec implementation exposes so the registry
/// can route a transfer syntax's `codec_kind` to it without depending on
/// the concrete codec type.
pub trait ImageCodecHandle: Send + Sync + std::fmt::Debug {
    /// The `CodecKind`s this codec claims to handle.
    fn handles(&self) -> &'static [CodecKind];
}

/// The registry of image codecs and the process-wide image size limit.
/// One `CodecFactory` is typically shared for the process's lifetime;
/// registration is expected to happen once, before concurrent use (spec §5).
#[derive(Debug)]
pub struct CodecFactory {
    image_codecs: RwLock<Vec<Arc<dyn ImageCodecHandle>>>,
    max_image_width: AtomicU32,
    max_image_height: AtomicU32,
    /// Guards registration so two threads racing `register_image_codec`
    /// append in a well-defined order rather than interleaving pushes.
    registration_lock: Mutex<()>,
}

impl Default for CodecFactory {
    fn default() -> Self {
        CodecFactory {
            image_codecs: RwLock::new(Vec::new()),
            max_image_width: AtomicU32::new(u32::MAX),
            max_image_height: AtomicU32::new(u32::MAX),
            registration_lock: Mutex::new(()),
        }
    }
}

impl CodecFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an image codec at the end of the registration order (spec
    /// §4.8: "queried in registration order").
    pub fn register_image_codec(&self, codec: Arc<dyn ImageCodecHandle>) {
        let _guard = self.registration_lock.lock();
        self.image_codecs.write().push(codec);
    }

    /// The first registered codec claiming `kind`, in registration order.
    pub fn image_codec_for(&self, ts: &TransferSyntax) -> Result<Arc<dyn ImageCodecHandle>> {
        self.image_codecs
            .read()
            .iter()
            .find(|c| c.handles().contains(&ts.codec_kind))
            .cloned()
            .ok_or_else(|| {
                tracing::warn!("no registered image codec handles {:?} ({})", ts.codec_kind, ts.uid);
                error::Error::WrongTransferSyntax { uid: ts.uid.to_string() }
            })
    }

    pub fn set_max_image_width(&self, width: u32) {
        self.max_image_width.store(width, Ordering::Relaxed);
    }

    pub fn set_max_image_height(&self, height: u32) {
        self.max_image_height.store(height, Ordering::Relaxed);
    }

    pub fn max_image_width(&self) -> u32 {
        self.max_image_width.load(Ordering::Relaxed)
    }

    pub fn max_image_height(&self) -> u32 {
        self.max_image_height.load(Ordering::Relaxed)
    }

    /// Fails with `ImageTooBig` before any pixel decode happens, per spec
    /// end-to-end scenario F.
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<()> {
        let max_w = self.max_image_width();
        let max_h = self.max_image_height();
        if width > max_w || height > max_h {
            return error::ImageTooBigSnafu { width, height, max_width: max_w, max_height: max_h }.fail();
        }
        Ok(())
    }

    /// Looks up the transfer syntax table entry for `uid`, failing with
    /// `WrongTransferSyntax` if unrecognized.
    pub fn transfer_syntax_for(&self, uid: &str) -> Result<&'static TransferSyntax> {
        transfer_syntax::for_uid(uid)
            .ok_or_else(|| error::Error::WrongTransferSyntax { uid: uid.to_string() })
    }
}

/// The process-wide convenience default, built empty of image codecs —
/// `rsdcm-pixeldata::register_default_codecs` populates it. Per spec §9
/// ("Singletons"), callers should prefer an explicitly constructed
/// `CodecFactory`; this exists only for convenience, and static
/// initialization order is never relied upon beyond `once_cell`'s own
/// guarantee.
pub static DEFAULT: once_cell::sync::Lazy<CodecFactory> = once_cell::sync::Lazy::new(CodecFactory::new);

/// Sniffs which DICOM container variant `stream` begins with, without
/// consuming more than the 132 bytes needed to decide. Neither variant
/// matching is a `WrongFormat` the caller's autodetect loop is expected to
/// catch and move on from (spec §4.5).
pub fn detect_container(stream: &StreamView) -> Result<ContainerKind> {
    let mut probe = stream.clone();
    let mut head = [0u8; 132];
    let mut n = 0usize;
    while n < head.len() {
        match probe.read(&mut head[n..]) {
            Ok(0) | Err(_) => break,
            Ok(got) => n += got,
        }
    }
    if n >= 132 && &head[128..132] == b"DICM" {
        return Ok(ContainerKind::Preamble);
    }
    // A bare-element stream begins directly with a group/element pair;
    // the file-meta group is always (0002,xxxx), so a plausible bare
    // stream's first two bytes (little-endian group) are 0x02 0x00.
    if n >= 2 && head[0] == 0x02 && head[1] == 0x00 {
        tracing::debug!("no preamble found, falling back to bare-element autodetection");
        return Ok(ContainerKind::BareElement);
    }
    tracing::warn!("neither the preamble nor the bare-element pattern matched the first {} bytes", n);
    error::WrongFormatSnafu.fail()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn detects_preamble_variant() {
        let mut data = vec![0u8; 128];
        data.extend_from_slice(b"DICM");
        data.extend_from_slice(&[2, 0, 0, 0]);
        let stream = StreamView::new_seekable(Cursor::new(data), None).unwrap();
        assert_eq!(detect_container(&stream).unwrap(), ContainerKind::Preamble);
    }

    #[test]
    fn detects_bare_element_variant() {
        let data = vec![2, 0, 0, 0, b'U', b'L', 4, 0, 0, 0, 0, 0];
        let stream = StreamView::new_seekable(Cursor::new(data), None).unwrap();
        assert_eq!(detect_container(&stream).unwrap(), ContainerKind::BareElement);
    }

    #[test]
    fn neither_pattern_is_wrong_format() {
        let data = vec![0xFF; 16];
        let stream = StreamView::new_seekable(Cursor::new(data), None).unwrap();
        assert!(detect_container(&stream).is_err());
    }

    #[test]
    fn dimension_check_fails_over_the_configured_max() {
        let factory = CodecFactory::new();
        factory.set_max_image_width(1024);
        factory.set_max_image_height(1024);
        assert!(factory.check_dimensions(2048, 512).is_err());
        assert!(factory.check_dimensions(512, 512).is_ok());
    }
}
