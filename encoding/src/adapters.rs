//! The seam between a generic object carrying pixel data and a
//! transfer-syntax-specific image codec (spec §4.6 "Codec pipeline").
//!
//! An object that merely needs to expose its pixel-data-relevant attributes
//! implements [`PixelDataObject`]; a codec that knows how to turn raw
//! encapsulated fragments into samples implements [`PixelDataReader`] (and
//! the reverse, [`PixelDataWriter`]), without either side depending on the
//! full `Dataset` type.

use rsdcm_core::ops::AttributeOp;
use snafu::Snafu;
use std::borrow::Cow;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum DecodeError {
    #[snafu(display("{}", source))]
    Custom { message: String, source: Box<dyn std::error::Error + Send + Sync + 'static> },

    #[snafu(display("pixel data is not encapsulated"))]
    NotEncapsulated,

    #[snafu(display("frame index out of bounds"))]
    FrameRangeOutOfBounds,

    #[snafu(display("missing required attribute `{name}`"))]
    MissingAttribute { name: &'static str },
}

pub type DecodeResult<T, E = DecodeError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum EncodeError {
    #[snafu(display("{}", source))]
    Custom { message: String, source: Box<dyn std::error::Error + Send + Sync + 'static> },

    #[snafu(display("pixel data is already encapsulated"))]
    NotNative,

    #[snafu(display("frame index out of bounds"))]
    FrameRangeOutOfBounds,

    #[snafu(display("missing required attribute `{name}`"))]
    MissingAttribute { name: &'static str },
}

pub type EncodeResult<T, E = EncodeError> = std::result::Result<T, E>;

/// The raw fragment list and Basic Offset Table of an encapsulated Pixel
/// Data element, independent of any particular object representation.
#[derive(Debug, Clone, Default)]
pub struct RawPixelData {
    pub fragments: Vec<Vec<u8>>,
    pub offset_table: Vec<u32>,
}

/// What a codec needs to know about the object it's decoding or encoding
/// pixel data for, without depending on `rsdcm-object` directly.
pub trait PixelDataObject {
    fn transfer_syntax_uid(&self) -> &str;
    fn rows(&self) -> Option<u16>;
    fn cols(&self) -> Option<u16>;
    fn samples_per_pixel(&self) -> Option<u16>;
    fn bits_allocated(&self) -> Option<u16>;
    fn bits_stored(&self) -> Option<u16>;
    fn number_of_frames(&self) -> Option<u32>;
    fn number_of_fragments(&self) -> Option<u32>;
    fn fragment(&self, index: usize) -> Option<Cow<[u8]>>;
    fn offset_table(&self) -> Option<Cow<[u32]>>;
    fn raw_pixel_data(&self) -> Option<RawPixelData>;
}

/// Encoder tuning knobs a caller may supply; a codec is free to ignore
/// whichever of these don't apply to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    pub quality: Option<u8>,
    pub effort: Option<u8>,
}

/// Decodes encapsulated pixel data for one transfer syntax.
pub trait PixelDataReader {
    /// Decodes every frame into `dst`, in frame order.
    fn decode(&self, src: &dyn PixelDataObject, dst: &mut Vec<u8>) -> DecodeResult<()> {
        let frames = src.number_of_frames().unwrap_or(1);
        for frame in 0..frames {
            self.decode_frame(src, frame, dst)?;
        }
        Ok(())
    }

    /// Decodes a single frame, appending raw samples to `dst`.
    fn decode_frame(&self, src: &dyn PixelDataObject, frame: u32, dst: &mut Vec<u8>) -> DecodeResult<()>;
}

/// Encodes native pixel data into one transfer syntax's encapsulated form.
pub trait PixelDataWriter {
    /// Encodes every frame, returning the concatenated fragment bytes (one
    /// fragment per frame) and the attribute updates the caller should
    /// apply (photometric interpretation, planar configuration, lossy
    /// compression ratio, ...).
    fn encode(
        &self,
        src: &dyn PixelDataObject,
        options: EncodeOptions,
        dst: &mut Vec<Vec<u8>>,
    ) -> EncodeResult<Vec<AttributeOp>> {
        let frames = src.number_of_frames().unwrap_or(1);
        let mut ops = Vec::new();
        for frame in 0..frames {
            let mut fragment = Vec::new();
            let frame_ops = self.encode_frame(src, frame, options, &mut fragment)?;
            dst.push(fragment);
            ops = frame_ops;
        }
        Ok(ops)
    }

    /// Encodes a single frame into `dst`, returning the attribute updates
    /// this encoding implies.
    fn encode_frame(
        &self,
        src: &dyn PixelDataObject,
        frame: u32,
        options: EncodeOptions,
        dst: &mut Vec<u8>,
    ) -> EncodeResult<Vec<AttributeOp>>;
}

pub type DynPixelDataReader = Box<dyn PixelDataReader + Send + Sync>;
pub type DynPixelDataWriter = Box<dyn PixelDataWriter + Send + Sync>;

/// A placeholder adapter for a `CodecKind` that has no reader/writer yet
/// (for example the JPEG 2000 registry stub): every method is reachable
/// only through a codec lookup that should never have produced one of
/// these in the first place.
#[derive(Debug, Clone, Copy)]
pub enum NeverPixelAdapter {}

impl PixelDataReader for NeverPixelAdapter {
    fn decode_frame(&self, _src: &dyn PixelDataObject, _frame: u32, _dst: &mut Vec<u8>) -> DecodeResult<()> {
        match *self {}
    }
}

impl PixelDataWriter for NeverPixelAdapter {
    fn encode_frame(
        &self,
        _src: &dyn PixelDataObject,
        _frame: u32,
        _options: EncodeOptions,
        _dst: &mut Vec<u8>,
    ) -> EncodeResult<Vec<AttributeOp>> {
        match *self {}
    }
}
