//! The decoded-image data model shared by every codec (spec §4.6-§4.9).
//!
//! A [`DecodedImage`] always stores its samples row-major and
//! channel-interleaved, regardless of how the source transfer syntax laid
//! them out on the wire (planar native, per-plane RLE, per-component JPEG
//! scans) — each codec's decoder is responsible for de-interleaving on the
//! way in and re-interleaving on the way out, so everything above this
//! module sees one consistent shape.

use crate::error::{Error, Result};

/// `(0028,0004)` PhotometricInterpretation, restricted to the values this
/// crate's codecs know how to lay out pixels for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Monochrome1,
    Monochrome2,
    PaletteColor,
    Rgb,
    YbrFull,
    YbrFull422,
}

impl ColorSpace {
    /// How many samples per pixel a value of this color space requires.
    pub fn samples_per_pixel(self) -> u16 {
        match self {
            ColorSpace::Monochrome1 | ColorSpace::Monochrome2 | ColorSpace::PaletteColor => 1,
            ColorSpace::Rgb | ColorSpace::YbrFull | ColorSpace::YbrFull422 => 3,
        }
    }

    pub fn as_photometric_str(self) -> &'static str {
        match self {
            ColorSpace::Monochrome1 => "MONOCHROME1",
            ColorSpace::Monochrome2 => "MONOCHROME2",
            ColorSpace::PaletteColor => "PALETTE COLOR",
            ColorSpace::Rgb => "RGB",
            ColorSpace::YbrFull => "YBR_FULL",
            ColorSpace::YbrFull422 => "YBR_FULL_422",
        }
    }

    pub fn from_photometric_str(s: &str) -> Result<Self> {
        match s.trim_end_matches([' ', '\0']) {
            "MONOCHROME1" => Ok(ColorSpace::Monochrome1),
            "MONOCHROME2" => Ok(ColorSpace::Monochrome2),
            "PALETTE COLOR" => Ok(ColorSpace::PaletteColor),
            "RGB" => Ok(ColorSpace::Rgb),
            "YBR_FULL" => Ok(ColorSpace::YbrFull),
            "YBR_FULL_422" => Ok(ColorSpace::YbrFull422),
            other => Err(Error::InvalidValue { reason: format!("unsupported photometric interpretation '{other}'") }),
        }
    }
}

/// Decoding/encoding quality, named the way spec §4.6 names the JPEG
/// quality knob. Ignored by lossless codecs (native, RLE, the two
/// lossless JPEG transfer syntaxes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl Quality {
    /// The classic libjpeg 0-100 quality percentage this level maps to,
    /// used to pick a quantization table scale (spec §4.6).
    pub fn as_percent(self) -> u8 {
        match self {
            Quality::VeryHigh => 95,
            Quality::High => 85,
            Quality::Medium => 70,
            Quality::Low => 50,
            Quality::VeryLow => 25,
        }
    }
}

/// The subset of `(0028,xxxx)` attributes every codec needs to interpret a
/// frame's raw bytes, read directly off the dataset by
/// [`crate::bridge::get_image`] before a codec is ever consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageParams {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u16,
    pub bits_allocated: u16,
    pub bits_stored: u16,
    pub high_bit: u16,
    /// `(0028,0103)` PixelRepresentation: `true` means two's-complement
    /// signed samples, `false` unsigned.
    pub signed: bool,
    /// `(0028,0006)` PlanarConfiguration: `true` means each channel's
    /// samples for a frame are stored contiguously (planar); `false` means
    /// they are interleaved pixel-by-pixel.
    pub planar: bool,
    pub color_space: ColorSpace,
}

impl ImageParams {
    /// Checks the handful of cross-attribute invariants spec §4.7/§8
    /// property 6 rely on: `samplesPerPixel` must agree with the color
    /// space, `bitsAllocated` must be a supported sample width, and
    /// `highBit` must sit at the top of the stored-bit window.
    pub fn validate(&self) -> Result<()> {
        if self.samples_per_pixel != self.color_space.samples_per_pixel() {
            return Err(Error::InvalidValue {
                reason: format!(
                    "{} requires {} samples per pixel, found {}",
                    self.color_space.as_photometric_str(),
                    self.color_space.samples_per_pixel(),
                    self.samples_per_pixel
                ),
            });
        }
        if ![1u16, 8, 16, 32].contains(&self.bits_allocated) {
            return Err(Error::InvalidValue { reason: format!("unsupported bits allocated {}", self.bits_allocated) });
        }
        if self.bits_stored == 0 || self.bits_stored > self.bits_allocated {
            return Err(Error::InvalidValue {
                reason: format!("bits stored {} exceeds bits allocated {}", self.bits_stored, self.bits_allocated),
            });
        }
        if self.high_bit + 1 != self.bits_stored {
            return Err(Error::InvalidValue {
                reason: format!("high bit {} is not bits stored - 1 ({})", self.high_bit, self.bits_stored - 1),
            });
        }
        Ok(())
    }

    /// One frame's size in bits: `rows * columns * samplesPerPixel *
    /// bitsAllocated` (spec §4.7).
    pub fn frame_size_bits(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.samples_per_pixel as u64 * self.bits_allocated as u64
    }

    pub fn frame_size_bytes(&self) -> u64 {
        (self.frame_size_bits() + 7) / 8
    }

    /// A value too large for `frameIndex`/`frameNumber` to compare against
    /// is itself a shape error rather than a silent truncation.
    pub fn shape_matches(&self, other: &ImageParams) -> bool {
        self == other
    }
}

/// One color channel's lookup table, read off a pair of `(0028,11xx)`
/// descriptor / `(0028,12xx)` data tags (spec §4.9 step 5). Purely a data
/// object, like [`crate::bridge`]'s sibling in `rsdcm-object`'s
/// `Dataset::get_lut`; applying it to samples is the external Transforms
/// collaborator's job (spec §1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteChannelLut {
    pub number_of_entries: i64,
    pub first_input_value: i64,
    pub bits_per_entry: i64,
    pub data: Vec<i64>,
}

/// A `PALETTE COLOR` image's red/green/blue lookup tables, built from the
/// Palette Color LUT tags `(0028,1101-1103)`/`(0028,1201-1203)` rather than
/// an `SQ` item (those tags sit directly on the dataset, unlike the
/// Modality/VOI LUT sequences `Dataset::get_lut` reads).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub red: PaletteChannelLut,
    pub green: PaletteChannelLut,
    pub blue: PaletteChannelLut,
}

/// One decoded frame: row-major, channel-interleaved samples alongside the
/// attributes that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub params: ImageParams,
    /// Length is always `width * height * samplesPerPixel`. Each sample is
    /// sign-extended to `i32` regardless of `bitsAllocated`, so callers
    /// never need to special-case 8/16/32-bit storage.
    pub samples: Vec<i32>,
    /// Present only when `params.color_space` is `PaletteColor` (spec §4.9
    /// step 5).
    pub palette: Option<Palette>,
}

impl DecodedImage {
    pub fn new(params: ImageParams, samples: Vec<i32>) -> Result<Self> {
        params.validate()?;
        let expected = params.width as usize * params.height as usize * params.samples_per_pixel as usize;
        if samples.len() != expected {
            return Err(Error::InvalidValue {
                reason: format!("expected {expected} samples, found {}", samples.len()),
            });
        }
        Ok(DecodedImage { params, samples, palette: None })
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn sample(&self, x: u32, y: u32, channel: u16) -> i32 {
        let idx = (y as usize * self.params.width as usize + x as usize) * self.params.samples_per_pixel as usize
            + channel as usize;
        self.samples[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_space_round_trips_through_its_photometric_string() {
        for cs in [
            ColorSpace::Monochrome1,
            ColorSpace::Monochrome2,
            ColorSpace::PaletteColor,
            ColorSpace::Rgb,
            ColorSpace::YbrFull,
            ColorSpace::YbrFull422,
        ] {
            assert_eq!(ColorSpace::from_photometric_str(cs.as_photometric_str()).unwrap(), cs);
        }
    }

    #[test]
    fn validate_rejects_samples_per_pixel_mismatch() {
        let params = ImageParams {
            width: 4,
            height: 4,
            samples_per_pixel: 3,
            bits_allocated: 8,
            bits_stored: 8,
            high_bit: 7,
            signed: false,
            planar: false,
            color_space: ColorSpace::Monochrome2,
        };
        assert!(matches!(params.validate(), Err(Error::InvalidValue { .. })));
    }

    #[test]
    fn validate_rejects_high_bit_not_at_stored_top() {
        let params = ImageParams {
            width: 4,
            height: 4,
            samples_per_pixel: 1,
            bits_allocated: 16,
            bits_stored: 12,
            high_bit: 15,
            signed: false,
            planar: false,
            color_space: ColorSpace::Monochrome2,
        };
        assert!(matches!(params.validate(), Err(Error::InvalidValue { .. })));
    }

    #[test]
    fn frame_size_accounts_for_samples_per_pixel() {
        let params = ImageParams {
            width: 10,
            height: 10,
            samples_per_pixel: 3,
            bits_allocated: 8,
            bits_stored: 8,
            high_bit: 7,
            signed: false,
            planar: true,
            color_space: ColorSpace::Rgb,
        };
        assert_eq!(params.frame_size_bytes(), 300);
    }
}
