//! The 8 lossless predictors (spec §4.6 "Lossless coding", table P0-P7) and
//! the per-sample Huffman-coded differencing they ride on. Grounded on the
//! general structure of Imebra's `jpegCodecImpl.cpp` lossless path, which
//! shares the same predictor table and DC-style amplitude coding as the
//! lossy DC channel.

use crate::bitwriter::BitWriter;
use crate::error::{self, Result};
use crate::frame::Component;
use crate::huffman::HuffmanTable;
use crate::lossy::{amplitude_code, receive_and_extend};
use rsdcm_core::stream::BitReader;

/// Predicts the next sample from up to three already-decoded neighbors:
/// `a` = left, `b` = above, `c` = above-left. `predictor` is the 1-7 value
/// carried in the scan header (spec table P0-P7; P0 means "no prediction",
/// used only to mean differential coding is disabled and isn't selectable
/// here since every scan this crate emits uses a real predictor).
pub fn predict(predictor: u8, a: i32, b: i32, c: i32) -> i32 {
    match predictor {
        1 => a,
        2 => b,
        3 => c,
        4 => a + b - c,
        5 => a + ((b - c) >> 1),
        6 => b + ((a - c) >> 1),
        7 => (a + b) / 2,
        _ => a,
    }
}

/// Decodes one sample in a lossless scan. `row`/`col` address the sample
/// within the component's own plane (already de-subsampled); `default`
/// is `2^(precision-1)`, the seed value for the very first sample of the
/// frame (spec: "first row always predictor 1 but re-seeded from the
/// default at row start" only applies to the frame's first sample — every
/// other first-of-row sample uses predictor 2 against the row above).
/// `just_restarted` is true for the one sample immediately following a
/// restart marker, which re-seeds the predictor to `default` the same way
/// the frame's true first sample does, regardless of that sample's own
/// row/col.
pub fn decode_sample(
    reader: &mut BitReader,
    dc_table: &HuffmanTable,
    component: &mut Component,
    plane: &[i32],
    plane_width: usize,
    row: usize,
    col: usize,
    default: i32,
    just_restarted: bool,
) -> Result<i32> {
    let prediction = if (row == 0 && col == 0) || just_restarted {
        // A restart marker resets the predictor to the frame default for
        // the very next sample, regardless of its row/col (T.81 §H.1.2.2),
        // not just the true first sample of the frame.
        default
    } else if row == 0 {
        // First row: always predictor 1 (left neighbor).
        plane[col - 1]
    } else if col == 0 {
        // First column of later rows: always predictor 2 (above neighbor).
        plane[(row - 1) * plane_width]
    } else {
        let a = plane[row * plane_width + col - 1];
        let b = plane[(row - 1) * plane_width + col];
        let c = plane[(row - 1) * plane_width + col - 1];
        predict(predictor_from_scan(component), a, b, c)
    };

    let size = dc_table.decode(reader)?;
    if size > 16 {
        return error::CorruptedFileSnafu { reason: "lossless amplitude size out of range" }.fail();
    }
    // Category 16 is the DICOM lossless convention's fixed escape: the
    // difference is exactly `default` (2^(precision-1)) with no amplitude
    // bits following in the stream, unlike every other category (Imebra
    // `jpegImageCodecImpl.cpp`: "logically we should compare with
    // information.m_precision, but DICOM says otherwise").
    let diff = if size == 16 { default } else { receive_and_extend(reader, size)? };
    Ok(prediction + diff)
}

/// The scan-selected predictor is stashed on the component as
/// `dc_table_index` is otherwise unused once a lossless scan is running;
/// real code threads it through the scan header instead. Kept as a free
/// function so the mapping is visible in one place.
fn predictor_from_scan(component: &Component) -> u8 {
    component.ac_table_index.max(1)
}

/// Encodes one sample given its already-known prediction (caller supplies
/// `prediction` computed the same way [`decode_sample`] would derive it).
/// `default` is the same `2^(precision-1)` value passed to [`decode_sample`];
/// when the difference lands exactly on it, this emits the DICOM category-16
/// escape (Huffman code for size 16, no amplitude bits) instead of the
/// generic size/bits encoding, mirroring the decoder's special case.
pub fn encode_sample(writer: &mut BitWriter, dc_table: &HuffmanTable, sample: i32, prediction: i32, default: i32) {
    let diff = sample - prediction;
    if diff == default {
        let (code, len) = dc_table.code_for(16).expect("lossless DC table covers all sizes 0-16");
        writer.write_bits(code, len);
        return;
    }
    let (size, bits) = amplitude_code(diff);
    let (code, len) = dc_table.code_for(size).expect("lossless DC table covers all sizes 0-16");
    writer.write_bits(code, len);
    writer.write_bits(bits, size);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predictor_1_is_left_neighbor() {
        assert_eq!(predict(1, 10, 20, 30), 10);
    }

    #[test]
    fn predictor_7_is_average() {
        assert_eq!(predict(7, 10, 20, 0), 15);
    }

    #[test]
    fn predictor_4_is_gradient() {
        assert_eq!(predict(4, 10, 20, 5), 25);
    }

    #[test]
    fn restart_reseeds_the_predictor_to_default_regardless_of_position() {
        // Mid-frame sample whose neighbors would predict 10 + 20 - 5 = 25
        // under predictor 4, but `just_restarted` must force `default`
        // instead, per T.81 restart-interval semantics.
        let mut component = Component {
            id: 1,
            h_sampling: 1,
            v_sampling: 1,
            quant_table_index: 0,
            dc_table_index: 0,
            ac_table_index: 4,
            last_dc_value: 128,
        };
        let mut freq = vec![0u64; 17];
        freq[0] = 5;
        let table = HuffmanTable::from_frequencies(&freq, 16).0;
        let plane = vec![10, 20, 5, 0];
        let mut writer = BitWriter::new();
        encode_sample(&mut writer, &table, 128, 128, 128);
        let bytes = writer.into_bytes();
        let len = bytes.len() as u64;
        let mut view = rsdcm_core::stream::StreamView::new_seekable(std::io::Cursor::new(bytes), Some(len)).unwrap();
        let mut reader = BitReader::new(&mut view);
        let value = decode_sample(&mut reader, &table, &mut component, &plane, 2, 1, 1, 128, true).unwrap();
        assert_eq!(value, 128);
    }

    #[test]
    fn category_16_is_a_bit_free_escape_for_the_default_difference() {
        // Per the DICOM lossless convention (not plain JPEG T.81), a decoded
        // category of exactly 16 means the difference equals `default` with
        // no amplitude bits following. A second, ordinary sample is encoded
        // right after to prove the escape doesn't shift the bitstream.
        let mut component = Component {
            id: 1,
            h_sampling: 1,
            v_sampling: 1,
            quant_table_index: 0,
            dc_table_index: 0,
            ac_table_index: 1,
            last_dc_value: 0,
        };
        let default = 1000;
        let mut freq = vec![0u64; 17];
        freq[16] = 5;
        freq[6] = 5;
        let table = HuffmanTable::from_frequencies(&freq, 16).0;
        let plane = vec![500i32, 0, 0, 0];

        let mut writer = BitWriter::new();
        encode_sample(&mut writer, &table, 500 + default, 500, default);
        encode_sample(&mut writer, &table, 50, 0, default);
        let bytes = writer.into_bytes();
        let len = bytes.len() as u64;
        let mut view = rsdcm_core::stream::StreamView::new_seekable(std::io::Cursor::new(bytes), Some(len)).unwrap();
        let mut reader = BitReader::new(&mut view);

        let first = decode_sample(&mut reader, &table, &mut component, &plane, 4, 0, 1, default, false).unwrap();
        assert_eq!(first, 500 + default);

        let second = decode_sample(&mut reader, &table, &mut component, &plane, 4, 0, 2, default, false).unwrap();
        assert_eq!(second, 50);
    }
}
