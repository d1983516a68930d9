//! Per-block lossy coding: DC differencing, zigzag AC run-length coding,
//! and the DCT/quantization glue (spec §4.6 "Baseline/extended lossy
//! coding"). Grounded on the general shape of Imebra's
//! `jpegCodecImpl.cpp` block readers/writers, adapted to this crate's
//! table types.

use crate::bitwriter::BitWriter;
use crate::dct::{fdct_8x8, idct_8x8};
use crate::error::{self, Result};
use crate::frame::Component;
use crate::huffman::HuffmanTable;
use crate::quant::{dezigzag, zigzag};
use rsdcm_core::stream::BitReader;

/// Sign-extends a JPEG amplitude code: a Huffman-decoded length `size`
/// (0-16) followed by `size` raw bits, where values `< 2^(size-1)` are
/// negative (spec §4.6 "DC diff via Huffman+sign-extension").
pub fn receive_and_extend(reader: &mut BitReader, size: u8) -> Result<i32> {
    if size == 0 {
        return Ok(0);
    }
    let raw = reader.read_bits(size as u32)? as i32;
    let half = 1i32 << (size - 1);
    Ok(if raw < half { raw - (1 << size) + 1 } else { raw })
}

/// The inverse of [`receive_and_extend`]'s convention: returns the
/// `(size, bits)` pair to emit for a signed amplitude.
pub fn amplitude_code(value: i32) -> (u8, u32) {
    if value == 0 {
        return (0, 0);
    }
    let abs = value.unsigned_abs();
    let size = 32 - abs.leading_zeros() as u8;
    let bits = if value > 0 { value as u32 } else { (value - 1) as u32 & ((1u32 << size) - 1) };
    (size, bits)
}

/// Decodes one 8x8 block's DC+AC coefficients, dequantizes, and runs the
/// inverse DCT, returning sample-domain values (still level-shifted by
/// `+2^(precision-1)`; the caller removes that offset).
pub fn decode_block(
    reader: &mut BitReader,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    quant_decompression: &[i32; 64],
    component: &mut Component,
) -> Result<[i32; 64]> {
    let mut coeffs = [0i32; 64];

    let dc_size = dc_table.decode(reader)?;
    if dc_size > 16 {
        return error::CorruptedFileSnafu { reason: "DC coefficient size out of range" }.fail();
    }
    let diff = receive_and_extend(reader, dc_size)?;
    component.last_dc_value += diff;
    coeffs[0] = component.last_dc_value;

    let mut k = 1usize;
    while k < 64 {
        let rs = ac_table.decode(reader)?;
        let run = rs >> 4;
        let size = rs & 0x0F;
        if size == 0 {
            if run == 15 {
                // ZRL: 16 zero coefficients, no value.
                k += 16;
                continue;
            }
            // EOB: the rest of the block is zero.
            break;
        }
        k += run as usize;
        if k >= 64 {
            return error::CorruptedFileSnafu { reason: "AC run exceeds block length" }.fail();
        }
        coeffs[k] = receive_and_extend(reader, size)?;
        k += 1;
    }

    let natural = dezigzag(&coeffs);
    let mut dequantized = [0i32; 64];
    for i in 0..64 {
        dequantized[i] = ((natural[i] as i64 * quant_decompression[i] as i64) >> 14) as i32;
    }
    idct_8x8(&mut dequantized);
    Ok(dequantized)
}

/// Quantizes, runs the forward DCT, DC-diffs and zigzag/run-length
/// encodes one 8x8 sample block (level-shifted by the caller already).
pub fn encode_block(
    writer: &mut BitWriter,
    samples: &[i32; 64],
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
    quant_compression: &[i32; 64],
    component: &mut Component,
) {
    let mut block = *samples;
    fdct_8x8(&mut block);

    let mut natural = [0i32; 64];
    for i in 0..64 {
        natural[i] = (block[i] as i64 * quant_compression[i] as i64 >> 14) as i32;
    }
    let coeffs = zigzag(&natural);

    let diff = coeffs[0] - component.last_dc_value;
    component.last_dc_value = coeffs[0];
    let (size, bits) = amplitude_code(diff);
    let (code, len) = dc_table.code_for(size).expect("DC Huffman table covers all sizes 0-16");
    writer.write_bits(code, len);
    writer.write_bits(bits, size);

    let mut run = 0u8;
    for k in 1..64 {
        if coeffs[k] == 0 {
            run += 1;
            continue;
        }
        while run >= 16 {
            let (code, len) = ac_table.code_for(0xF0).expect("AC table has a ZRL entry");
            writer.write_bits(code, len);
            run -= 16;
        }
        let (size, bits) = amplitude_code(coeffs[k]);
        let rs = (run << 4) | size;
        let (code, len) = ac_table.code_for(rs).expect("AC table covers every (run,size) emitted");
        writer.write_bits(code, len);
        writer.write_bits(bits, size);
        run = 0;
    }
    if run > 0 {
        let (code, len) = ac_table.code_for(0x00).expect("AC table has an EOB entry");
        writer.write_bits(code, len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amplitude_code_round_trips_sign() {
        for v in [-1000, -255, -1, 1, 255, 1000] {
            let (size, bits) = amplitude_code(v);
            let half = 1i32 << (size - 1);
            let recovered = if bits < half as u32 {
                bits as i32 - (1 << size) + 1
            } else {
                bits as i32
            };
            assert_eq!(recovered, v);
        }
    }

    #[test]
    fn zero_amplitude_has_zero_size() {
        assert_eq!(amplitude_code(0), (0, 0));
    }
}
