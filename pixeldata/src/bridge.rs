//! The `Dataset`<->[`DecodedImage`] bridge (spec §4.7, "getImage"/"setImage").
//!
//! `get_image` reads the Image Pixel module attributes off a dataset,
//! dispatches on the dataset's transfer syntax to the right codec, and
//! returns one frame's samples in the common interleaved shape. `set_image`
//! is append-only: it never rewrites an existing frame's bytes in place,
//! only appends a new encoded frame and bumps `NumberOfFrames` — the
//! resolved answer to this area's Open Question (see `DESIGN.md`).

use crate::error::{self, Result};
use crate::image::{ColorSpace, DecodedImage, ImageParams, Quality};
use crate::{jpeg_adapter, native, rle};
use rsdcm_core::header::Tag;
use rsdcm_core::memory::Memory;
use rsdcm_dictionary_std::StandardDataDictionary;
use rsdcm_encoding::handler::WritingHandler;
use rsdcm_object::Dataset;
use rsdcm_transfer_syntax_registry::transfer_syntax::for_uid;
use rsdcm_transfer_syntax_registry::CodecKind;

const TAG_ROWS: Tag = Tag(0x0028, 0x0010);
const TAG_COLUMNS: Tag = Tag(0x0028, 0x0011);
const TAG_SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
const TAG_BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
const TAG_BITS_STORED: Tag = Tag(0x0028, 0x0101);
const TAG_HIGH_BIT: Tag = Tag(0x0028, 0x0102);
const TAG_PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
const TAG_PLANAR_CONFIGURATION: Tag = Tag(0x0028, 0x0006);
const TAG_PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
const TAG_NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
pub(crate) const TAG_PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

/// Reads the Image Pixel module attributes a codec needs to interpret
/// `(7FE0,0010)`'s bytes, independent of any particular frame.
pub fn image_params(dataset: &Dataset) -> Result<ImageParams> {
    let width = dataset.get_int(TAG_COLUMNS, 0)? as u32;
    let height = dataset.get_int(TAG_ROWS, 0)? as u32;
    let samples_per_pixel = dataset.get_int(TAG_SAMPLES_PER_PIXEL, 0)? as u16;
    let bits_allocated = dataset.get_int(TAG_BITS_ALLOCATED, 0)? as u16;
    let bits_stored = dataset.get_int(TAG_BITS_STORED, 0)? as u16;
    let high_bit = dataset.get_int(TAG_HIGH_BIT, 0)? as u16;
    let signed = dataset.get_int(TAG_PIXEL_REPRESENTATION, 0)? != 0;
    let planar = dataset.get_int_default(TAG_PLANAR_CONFIGURATION, 0, 0)? != 0;
    let photometric = dataset.get_string(TAG_PHOTOMETRIC_INTERPRETATION, 0)?;
    let color_space = ColorSpace::from_photometric_str(&photometric)?;

    let params = ImageParams { width, height, samples_per_pixel, bits_allocated, bits_stored, high_bit, signed, planar, color_space };
    params.validate()?;
    Ok(params)
}

/// `(0028,0008)` NumberOfFrames, defaulting to 1 when absent (spec §4.7).
pub fn number_of_frames(dataset: &Dataset) -> Result<u32> {
    Ok(dataset.get_int_default(TAG_NUMBER_OF_FRAMES, 0, 1)? as u32)
}

fn codec_kind(dataset: &Dataset) -> Result<CodecKind> {
    let uid = dataset.transfer_syntax();
    let ts = for_uid(&uid).ok_or_else(|| {
        tracing::warn!("unrecognized transfer syntax UID {uid}, cannot select a codec");
        error::Error::Registry { source: rsdcm_transfer_syntax_registry::Error::WrongTransferSyntax { uid: uid.clone() } }
    })?;
    tracing::debug!("dispatching to {:?} codec for transfer syntax {uid}", ts.codec_kind);
    Ok(ts.codec_kind)
}

/// Decodes frame `frame` of `(7FE0,0010)` into the common image shape.
pub fn get_image(dataset: &Dataset, frame: u32) -> Result<DecodedImage> {
    get_image_with(&rsdcm_transfer_syntax_registry::factory::DEFAULT, dataset, frame)
}

/// As [`get_image`], but checking frame dimensions against an explicitly
/// constructed [`rsdcm_transfer_syntax_registry::CodecFactory`]'s configured
/// maximum instead of the process-wide convenience default (spec §4.9 step
/// 3 validation, §8 scenario F: dimensions over the configured max fail
/// with `ImageTooBig` before any pixel decode is attempted).
pub fn get_image_with(
    factory: &rsdcm_transfer_syntax_registry::CodecFactory,
    dataset: &Dataset,
    frame: u32,
) -> Result<DecodedImage> {
    let params = image_params(dataset)?;
    factory.check_dimensions(params.width, params.height)?;
    let frame_count = number_of_frames(dataset)?;
    if frame >= frame_count {
        return Err(error::Error::FrameOutOfRange { frame, frame_count });
    }

    let image = match codec_kind(dataset)? {
        CodecKind::Native => {
            let buffer = dataset.get_buffer(TAG_PIXEL_DATA, 0)?;
            let handler = buffer.get_raw_reading_handler()?;
            native::unpack_frame(handler.bytes(), &params, frame)
        }
        CodecKind::Rle => {
            let fragment = dataset.get_buffer(TAG_PIXEL_DATA, frame as usize + 1)?;
            let handler = fragment.get_raw_reading_handler()?;
            rle::decode_frame(handler.bytes(), &params)
        }
        CodecKind::Jpeg => {
            let fragment = dataset.get_buffer(TAG_PIXEL_DATA, frame as usize + 1)?;
            let handler = fragment.get_raw_reading_handler()?;
            jpeg_adapter::decode_frame(handler.bytes(), &params)
        }
        CodecKind::Jpeg2000 => {
            tracing::warn!("JPEG 2000 decoding requested for frame {frame}, which this crate does not implement");
            Err(error::Error::JpegUnsupported { what: "JPEG 2000 decoding".to_string() })
        }
    }?;

    if params.color_space == ColorSpace::PaletteColor {
        let palette = read_palette(dataset)?;
        return Ok(image.with_palette(palette));
    }
    Ok(image)
}

/// `(0028,1101-1103)` descriptors and `(0028,1201-1203)` data build the
/// red/green/blue lookup tables a `PALETTE COLOR` image needs (spec §4.9
/// step 5). These are plain dataset tags, not an `SQ` item, so this reads
/// them directly rather than through `Dataset::get_lut`.
fn read_palette(dataset: &Dataset) -> Result<crate::image::Palette> {
    Ok(crate::image::Palette {
        red: read_palette_channel(dataset, Tag(0x0028, 0x1101), Tag(0x0028, 0x1201))?,
        green: read_palette_channel(dataset, Tag(0x0028, 0x1102), Tag(0x0028, 0x1202))?,
        blue: read_palette_channel(dataset, Tag(0x0028, 0x1103), Tag(0x0028, 0x1203))?,
    })
}

fn read_palette_channel(dataset: &Dataset, descriptor_tag: Tag, data_tag: Tag) -> Result<crate::image::PaletteChannelLut> {
    let number_of_entries = dataset.get_int(descriptor_tag, 0)?;
    let first_input_value = dataset.get_int(descriptor_tag, 1)?;
    let bits_per_entry = dataset.get_int(descriptor_tag, 2)?;
    let count = if number_of_entries == 0 { 65536 } else { number_of_entries as usize };
    let mut data = Vec::with_capacity(count);
    for i in 0..count {
        match dataset.get_int(data_tag, i) {
            Ok(v) => data.push(v),
            Err(_) => break,
        }
    }
    Ok(crate::image::PaletteChannelLut { number_of_entries, first_input_value, bits_per_entry, data })
}

/// Appends `image` as frame `frame`, encoding it with the dataset's current
/// transfer syntax's codec and bumping `NumberOfFrames`. Fails with
/// [`error::Error::WrongFrame`] unless `frame` equals the dataset's current
/// frame count — insertion is append-only and must happen in order (spec
/// §4.7, §8 property 1). Fails with [`error::Error::DifferentFormat`] if
/// `image`'s shape doesn't match the dataset's existing Image Pixel
/// attributes (spec §4.7, §8 property 6).
///
/// Never rewrites frame bytes already present: this is how the crate
/// resolves the Open Question of whether `setImage` may overwrite in
/// place (see `DESIGN.md`) — append-only avoids ever invalidating a
/// previously returned `get_image` result or a Basic Offset Table entry
/// another reader already cached.
pub fn set_image(dataset: &Dataset, frame: u32, image: &DecodedImage, quality: Option<Quality>) -> Result<()> {
    let dict = StandardDataDictionary;
    let frame_count = if dataset.has_tag(TAG_PIXEL_DATA) { number_of_frames(dataset)? } else { 0 };
    if frame != frame_count {
        return Err(error::Error::WrongFrame { frame, frame_count });
    }
    if dataset.has_tag(TAG_PIXEL_DATA) {
        let existing = image_params(dataset)?;
        if !existing.shape_matches(&image.params) {
            return Err(error::Error::DifferentFormat);
        }
    } else {
        write_image_params(dataset, &image.params, &dict)?;
        dataset.get_or_create_tag(TAG_PIXEL_DATA, None, &dict)?;
    }

    match codec_kind(dataset)? {
        CodecKind::Native => {
            let packed = native::pack_frame(image);
            append_native_frame(dataset, packed)?;
        }
        CodecKind::Rle => {
            let fragment = rle::encode_frame(image)?;
            append_encapsulated_frame(dataset, fragment)?;
        }
        CodecKind::Jpeg => {
            let fragment = match quality {
                Some(q) if image.params.bits_stored <= 16 && quality_is_lossy(&dataset.transfer_syntax()) => {
                    jpeg_adapter::encode_frame_lossy(image, q)?
                }
                _ => jpeg_adapter::encode_frame_lossless(image)?,
            };
            append_encapsulated_frame(dataset, fragment)?;
        }
        CodecKind::Jpeg2000 => {
            return Err(error::Error::JpegUnsupported { what: "JPEG 2000 encoding".to_string() });
        }
    }

    dataset.set_int(TAG_NUMBER_OF_FRAMES, (frame_count + 1) as i64, &dict)?;
    Ok(())
}

/// The two lossless JPEG transfer syntaxes ignore a caller-supplied
/// quality and always encode lossless; only the two `.50`/`.51` (baseline,
/// extended) UIDs honor it.
fn quality_is_lossy(ts_uid: &str) -> bool {
    matches!(ts_uid.trim_end_matches(['\0', ' ']), "1.2.840.10008.1.2.4.50" | "1.2.840.10008.1.2.4.51")
}

fn write_image_params(dataset: &Dataset, params: &ImageParams, dict: &StandardDataDictionary) -> Result<()> {
    dataset.set_int(TAG_COLUMNS, params.width as i64, dict)?;
    dataset.set_int(TAG_ROWS, params.height as i64, dict)?;
    dataset.set_int(TAG_SAMPLES_PER_PIXEL, params.samples_per_pixel as i64, dict)?;
    dataset.set_int(TAG_BITS_ALLOCATED, params.bits_allocated as i64, dict)?;
    dataset.set_int(TAG_BITS_STORED, params.bits_stored as i64, dict)?;
    dataset.set_int(TAG_HIGH_BIT, params.high_bit as i64, dict)?;
    dataset.set_int(TAG_PIXEL_REPRESENTATION, params.signed as i64, dict)?;
    if params.samples_per_pixel > 1 {
        dataset.set_int(TAG_PLANAR_CONFIGURATION, params.planar as i64, dict)?;
    }
    dataset.set_string(TAG_PHOTOMETRIC_INTERPRETATION, params.color_space.as_photometric_str(), dict)?;
    Ok(())
}

/// Appends one frame's fragment after the Basic Offset Table (fragment 0,
/// seeded empty by `get_or_create_tag`), extending the BOT with this
/// fragment's little-endian 32-bit start offset measured from the end of
/// the BOT, counting 8 bytes of item overhead per prior fragment and
/// rounding each fragment up to an even length (spec §4.9 step 4).
///
/// `get_image` does not need to walk this table back: every fragment this
/// bridge ever writes holds exactly one whole frame, so fragment index
/// `frame + 1` always locates the right bytes directly — the same
/// `numberOfFrames + 1 == bufferCount` shortcut spec §4.9 step 4 sanctions
/// when the BOT is otherwise unnecessary to consult. The BOT is still
/// populated here for any other reader that does walk it.
fn append_encapsulated_frame(dataset: &Dataset, fragment: Vec<u8>) -> Result<()> {
    let mut fragment = fragment;
    if fragment.len() % 2 != 0 {
        fragment.push(0);
    }

    let existing_fragments = dataset.buffer_count(TAG_PIXEL_DATA)? - 1;
    let mut offset = 0u32;
    for i in 0..existing_fragments {
        let prior = dataset.get_buffer(TAG_PIXEL_DATA, i + 1)?;
        let len = prior.get_raw_reading_handler()?.bytes().len() as u32;
        offset += 8 + len;
    }

    let bot = dataset.get_buffer(TAG_PIXEL_DATA, 0)?;
    let mut bot_bytes = bot.get_raw_reading_handler()?.bytes().to_vec();
    bot_bytes.extend_from_slice(&offset.to_le_bytes());
    let mut handler = bot.get_raw_writing_handler()?;
    handler.set_bytes(bot_bytes);
    bot.commit_written(Box::new(handler).finish()?)?;

    dataset.push_fragment(TAG_PIXEL_DATA, Memory::from_vec(fragment))
}

/// Appends one frame's packed bytes to the native pixel data buffer's
/// single fragment (`get_or_create_tag` always seeds it, empty, the first
/// time `(7FE0,0010)` is touched), growing it rather than creating a
/// second fragment — native pixel data is never encapsulated.
fn append_native_frame(dataset: &Dataset, packed: Vec<u8>) -> Result<()> {
    let existing = dataset.get_buffer(TAG_PIXEL_DATA, 0)?;
    let mut bytes = existing.get_raw_reading_handler()?.bytes().to_vec();
    bytes.extend_from_slice(&packed);
    let mut handler = existing.get_raw_writing_handler()?;
    handler.set_bytes(bytes);
    existing.commit_written(Box::new(handler).finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ColorSpace;

    fn make_dataset() -> Dataset {
        let ds = Dataset::new();
        ds.set_transfer_syntax("1.2.840.10008.1.2.1");
        ds
    }

    fn flat_params() -> ImageParams {
        ImageParams {
            width: 2,
            height: 2,
            samples_per_pixel: 1,
            bits_allocated: 8,
            bits_stored: 8,
            high_bit: 7,
            signed: false,
            planar: false,
            color_space: ColorSpace::Monochrome2,
        }
    }

    #[test]
    fn round_trips_native_grayscale_frame() {
        let ds = make_dataset();
        let image = DecodedImage::new(flat_params(), vec![1, 2, 3, 4]).unwrap();
        set_image(&ds, 0, &image, None).unwrap();
        assert_eq!(number_of_frames(&ds).unwrap(), 1);
        let decoded = get_image(&ds, 0).unwrap();
        assert_eq!(decoded.samples, vec![1, 2, 3, 4]);
    }

    #[test]
    fn appends_a_second_native_frame_without_touching_the_first() {
        let ds = make_dataset();
        let image = DecodedImage::new(flat_params(), vec![1, 2, 3, 4]).unwrap();
        set_image(&ds, 0, &image, None).unwrap();
        let image2 = DecodedImage::new(flat_params(), vec![5, 6, 7, 8]).unwrap();
        set_image(&ds, 1, &image2, None).unwrap();
        assert_eq!(number_of_frames(&ds).unwrap(), 2);
        assert_eq!(get_image(&ds, 0).unwrap().samples, vec![1, 2, 3, 4]);
        assert_eq!(get_image(&ds, 1).unwrap().samples, vec![5, 6, 7, 8]);
    }

    #[test]
    fn rejects_shape_mismatch_on_a_later_set_image() {
        let ds = make_dataset();
        let image = DecodedImage::new(flat_params(), vec![1, 2, 3, 4]).unwrap();
        set_image(&ds, 0, &image, None).unwrap();
        let mut other_params = flat_params();
        other_params.width = 4;
        let other = DecodedImage::new(other_params, vec![0; 8]).unwrap();
        assert!(matches!(set_image(&ds, 1, &other, None), Err(error::Error::DifferentFormat)));
    }

    #[test]
    fn rejects_set_image_called_out_of_order() {
        let ds = make_dataset();
        let image = DecodedImage::new(flat_params(), vec![1, 2, 3, 4]).unwrap();
        assert!(matches!(
            set_image(&ds, 1, &image, None),
            Err(error::Error::WrongFrame { frame: 1, frame_count: 0 })
        ));
        set_image(&ds, 0, &image, None).unwrap();
        assert!(matches!(
            set_image(&ds, 0, &image, None),
            Err(error::Error::WrongFrame { frame: 0, frame_count: 1 })
        ));
    }

    #[test]
    fn rejects_out_of_range_frame() {
        let ds = make_dataset();
        let image = DecodedImage::new(flat_params(), vec![1, 2, 3, 4]).unwrap();
        set_image(&ds, 0, &image, None).unwrap();
        assert!(matches!(get_image(&ds, 5), Err(error::Error::FrameOutOfRange { .. })));
    }

    #[test]
    fn rejects_a_frame_wider_than_the_configured_maximum() {
        let ds = make_dataset();
        let image = DecodedImage::new(flat_params(), vec![1, 2, 3, 4]).unwrap();
        set_image(&ds, 0, &image, None).unwrap();

        let factory = rsdcm_transfer_syntax_registry::CodecFactory::new();
        factory.set_max_image_width(1);
        factory.set_max_image_height(1);
        assert!(matches!(
            get_image_with(&factory, &ds, 0),
            Err(error::Error::Registry { source: rsdcm_transfer_syntax_registry::Error::ImageTooBig { .. } })
        ));
    }
}
