//! RLE Lossless (PS3.5 Annex G): a PackBits-style byte-plane codec, the
//! `CodecKind::Rle` counterpart to [`crate::native`] (spec §4.7).
//!
//! A fragment starts with a 64-byte header: a little-endian `u32` segment
//! count followed by 15 little-endian `u32` segment offsets (unused slots
//! zero). Each segment packs one "byte plane" — for `bitsAllocated == 16`,
//! a channel contributes two segments (most significant byte first); for
//! `bitsAllocated == 8`, one. Segment order is channel-major, byte-minor:
//! channel 0's MSB plane, channel 0's LSB plane, channel 1's MSB plane, ...

use crate::error::{self, Result};
use crate::image::{DecodedImage, ImageParams};

const HEADER_LEN: usize = 64;

fn bytes_per_sample(params: &ImageParams) -> Result<usize> {
    match params.bits_allocated {
        8 => Ok(1),
        16 => Ok(2),
        other => error::InvalidValueSnafu { reason: format!("RLE codec does not support {other}-bit samples") }.fail(),
    }
}

/// Decodes one RLE fragment into a frame's channel-interleaved samples.
pub fn decode_frame(fragment: &[u8], params: &ImageParams) -> Result<DecodedImage> {
    let bps = bytes_per_sample(params)?;
    let pixels_per_frame = params.width as usize * params.height as usize;
    let expected_segments = params.samples_per_pixel as usize * bps;

    if fragment.len() < HEADER_LEN {
        return error::InvalidValueSnafu { reason: "RLE fragment shorter than its header".to_string() }.fail();
    }
    let segment_count = u32::from_le_bytes(fragment[0..4].try_into().unwrap()) as usize;
    if segment_count != expected_segments {
        return error::InvalidValueSnafu {
            reason: format!("RLE header declares {segment_count} segments, image shape implies {expected_segments}"),
        }
        .fail();
    }
    let mut offsets = Vec::with_capacity(segment_count);
    for i in 0..segment_count {
        let off = u32::from_le_bytes(fragment[4 + i * 4..8 + i * 4].try_into().unwrap()) as usize;
        offsets.push(off);
    }

    let mut planes = Vec::with_capacity(segment_count);
    for (i, &start) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(fragment.len() - HEADER_LEN);
        let segment = &fragment[HEADER_LEN + start..HEADER_LEN + end];
        planes.push(decode_segment(segment, pixels_per_frame)?);
    }

    let mut samples = vec![0i32; pixels_per_frame * params.samples_per_pixel as usize];
    for channel in 0..params.samples_per_pixel as usize {
        for pixel in 0..pixels_per_frame {
            let mut raw: u32 = 0;
            for byte_in_sample in 0..bps {
                let plane = &planes[channel * bps + byte_in_sample];
                raw = (raw << 8) | plane[pixel] as u32;
            }
            let value = sign_extend(raw, params.bits_stored, params.signed);
            samples[pixel * params.samples_per_pixel as usize + channel] = value;
        }
    }
    DecodedImage::new(*params, samples)
}

/// Encodes a frame into one RLE fragment, the inverse of [`decode_frame`].
pub fn encode_frame(image: &DecodedImage) -> Result<Vec<u8>> {
    let params = &image.params;
    let bps = bytes_per_sample(params)?;
    let pixels_per_frame = params.width as usize * params.height as usize;
    let segment_count = params.samples_per_pixel as usize * bps;

    let mut planes: Vec<Vec<u8>> = vec![vec![0u8; pixels_per_frame]; segment_count];
    for channel in 0..params.samples_per_pixel as usize {
        for pixel in 0..pixels_per_frame {
            let value = image.samples[pixel * params.samples_per_pixel as usize + channel] as u32;
            for byte_in_sample in 0..bps {
                let shift = 8 * (bps - 1 - byte_in_sample);
                planes[channel * bps + byte_in_sample][pixel] = (value >> shift) as u8;
            }
        }
    }

    let encoded_segments: Vec<Vec<u8>> = planes.iter().map(|p| encode_segment(p)).collect();

    let mut out = vec![0u8; HEADER_LEN];
    out[0..4].copy_from_slice(&(segment_count as u32).to_le_bytes());
    let mut offset = 0u32;
    for (i, seg) in encoded_segments.iter().enumerate() {
        out[4 + i * 4..8 + i * 4].copy_from_slice(&offset.to_le_bytes());
        offset += seg.len() as u32;
    }
    for seg in &encoded_segments {
        out.extend_from_slice(seg);
    }
    if out.len() % 2 != 0 {
        out.push(0);
    }
    Ok(out)
}

fn sign_extend(raw: u32, bits_stored: u16, signed: bool) -> i32 {
    let mask = if bits_stored >= 32 { u32::MAX } else { (1u32 << bits_stored) - 1 };
    let value = raw & mask;
    if signed && bits_stored < 32 && value & (1 << (bits_stored - 1)) != 0 {
        (value as i32) - (1 << bits_stored)
    } else {
        value as i32
    }
}

fn decode_segment(segment: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut i = 0usize;
    while i < segment.len() && out.len() < expected_len {
        let control = segment[i] as i8;
        i += 1;
        if control >= 0 {
            let count = control as usize + 1;
            let end = i + count;
            if end > segment.len() {
                return error::InvalidValueSnafu { reason: "RLE literal run overruns segment".to_string() }.fail();
            }
            out.extend_from_slice(&segment[i..end]);
            i = end;
        } else if control != -128 {
            if i >= segment.len() {
                return error::InvalidValueSnafu { reason: "RLE replicate run overruns segment".to_string() }.fail();
            }
            let count = 1 - control as isize;
            out.extend(std::iter::repeat(segment[i]).take(count as usize));
            i += 1;
        }
        // control == -128 is a documented no-op.
    }
    out.truncate(expected_len);
    if out.len() != expected_len {
        return error::InvalidValueSnafu { reason: "RLE segment decoded short of the expected plane size".to_string() }.fail();
    }
    Ok(out)
}

fn encode_segment(plane: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < plane.len() {
        let run_end = (i..plane.len()).take_while(|&j| plane[j] == plane[i]).count();
        if run_end >= 2 {
            let mut remaining = run_end;
            let mut pos = i;
            while remaining > 0 {
                let take = remaining.min(128);
                out.push((1 - take as i32) as i8 as u8);
                out.push(plane[pos]);
                pos += take;
                remaining -= take;
            }
            i += run_end;
        } else {
            let start = i;
            let mut len = 1;
            i += 1;
            while i < plane.len() && len < 128 {
                let next_run = (i..plane.len()).take_while(|&j| plane[j] == plane[i]).count();
                if next_run >= 2 {
                    break;
                }
                len += 1;
                i += 1;
            }
            out.push((len - 1) as u8);
            out.extend_from_slice(&plane[start..start + len]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ColorSpace;

    fn params(samples_per_pixel: u16, bits_allocated: u16) -> ImageParams {
        ImageParams {
            width: 4,
            height: 1,
            samples_per_pixel,
            bits_allocated,
            bits_stored: bits_allocated,
            high_bit: bits_allocated - 1,
            signed: false,
            planar: false,
            color_space: if samples_per_pixel == 1 { ColorSpace::Monochrome2 } else { ColorSpace::Rgb },
        }
    }

    #[test]
    fn round_trips_flat_8bit_grayscale() {
        let p = params(1, 8);
        let image = DecodedImage::new(p, vec![7, 7, 7, 7]).unwrap();
        let fragment = encode_frame(&image).unwrap();
        let decoded = decode_frame(&fragment, &p).unwrap();
        assert_eq!(decoded.samples, image.samples);
    }

    #[test]
    fn round_trips_varied_16bit_grayscale() {
        let p = params(1, 16);
        let image = DecodedImage::new(p, vec![10, 2000, 2000, 65535]).unwrap();
        let fragment = encode_frame(&image).unwrap();
        let decoded = decode_frame(&fragment, &p).unwrap();
        assert_eq!(decoded.samples, image.samples);
    }

    #[test]
    fn round_trips_rgb_8bit() {
        let p = params(3, 8);
        let image = DecodedImage::new(p, vec![1, 2, 3, 1, 2, 3, 1, 2, 3, 9, 9, 9]).unwrap();
        let fragment = encode_frame(&image).unwrap();
        let decoded = decode_frame(&fragment, &p).unwrap();
        assert_eq!(decoded.samples, image.samples);
    }

    #[test]
    fn literal_run_round_trips() {
        let segment = encode_segment(&[1, 2, 3, 4, 5]);
        assert_eq!(decode_segment(&segment, 5).unwrap(), vec![1, 2, 3, 4, 5]);
    }
}
