//! Wires `rsdcm-jpeg-codec`'s decoder/encoders to the
//! [`DecodedImage`](crate::image::DecodedImage) shape the bridge and every
//! other codec share (spec §4.6).
//!
//! Transfer syntax selects baseline/extended vs. lossless purely by which
//! `encode_lossy`/`encode_lossless` entry point is called; decoding needs
//! no such branch since [`rsdcm_jpeg_codec::decode`] reads the SOF marker
//! itself.

use crate::error::{self, Result};
use crate::image::{DecodedImage, ImageParams, Quality};
use rsdcm_jpeg_codec::JpegImage;

/// Maps `pixeldata::image::Quality` onto an IJG 0-100 quality percentage,
/// the only unit `rsdcm_jpeg_codec::encode_lossy_with_quality` accepts —
/// kept here rather than in `jpeg-codec` so this crate's quality scale
/// stays the single source of truth callers see.
fn quality_percent(quality: Quality) -> u32 {
    quality.as_percent() as u32
}

fn to_jpeg_image(image: &DecodedImage) -> JpegImage {
    JpegImage {
        width: image.params.width as u16,
        height: image.params.height as u16,
        precision: image.params.bits_stored as u8,
        samples_per_pixel: image.params.samples_per_pixel as u8,
        samples: image.samples.clone(),
    }
}

fn from_jpeg_image(decoded: JpegImage, params: &ImageParams) -> Result<DecodedImage> {
    if decoded.width as u32 != params.width || decoded.height as u32 != params.height {
        return Err(error::Error::InvalidValue {
            reason: format!(
                "decoded JPEG is {}x{}, dataset declares {}x{}",
                decoded.width, decoded.height, params.width, params.height
            ),
        });
    }
    DecodedImage::new(*params, decoded.samples)
}

/// Decodes one JPEG (baseline/extended/lossless) fragment into a frame.
pub fn decode_frame(fragment: &[u8], params: &ImageParams) -> Result<DecodedImage> {
    let decoded = rsdcm_jpeg_codec::decode(fragment).map_err(|source| error::Error::CorruptedJpeg { reason: source.to_string() })?;
    from_jpeg_image(decoded, params)
}

/// Encodes a frame as lossless JPEG (SOF3, predictor 1), used for the two
/// lossless JPEG transfer syntaxes.
pub fn encode_frame_lossless(image: &DecodedImage) -> Result<Vec<u8>> {
    let jpeg_image = to_jpeg_image(image);
    rsdcm_jpeg_codec::encode_lossless(&jpeg_image, 1).map_err(|source| error::Error::CorruptedJpeg { reason: source.to_string() })
}

/// Encodes a frame as baseline (8-bit) or extended (>8-bit) lossy JPEG at
/// the given quality, used for the two lossy JPEG transfer syntaxes.
pub fn encode_frame_lossy(image: &DecodedImage, quality: Quality) -> Result<Vec<u8>> {
    let jpeg_image = to_jpeg_image(image);
    let extended = image.params.bits_stored > 8;
    rsdcm_jpeg_codec::encode_lossy_with_quality(&jpeg_image, quality_percent(quality), extended)
        .map_err(|source| error::Error::CorruptedJpeg { reason: source.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ColorSpace;

    fn params() -> ImageParams {
        ImageParams {
            width: 8,
            height: 8,
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
    fn lossless_round_trip_recovers_flat_frame() {
        let p = params();
        let image = DecodedImage::new(p, vec![42; 64]).unwrap();
        let fragment = encode_frame_lossless(&image).unwrap();
        let decoded = decode_frame(&fragment, &p).unwrap();
        assert_eq!(decoded.samples, image.samples);
    }

    #[test]
    fn lossy_encode_produces_a_decodable_fragment() {
        let p = params();
        let image = DecodedImage::new(p, vec![100; 64]).unwrap();
        let fragment = encode_frame_lossy(&image, Quality::High).unwrap();
        let decoded = decode_frame(&fragment, &p).unwrap();
        assert_eq!(decoded.samples.len(), image.samples.len());
    }
}
