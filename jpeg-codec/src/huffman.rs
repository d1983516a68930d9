//! Canonical Huffman tables: construction from a value-frequency histogram
//! (encoder) or from an explicit per-length count table (decoder, read off
//! a `DHT` marker), and the table-driven decode/encode operations
//! themselves (spec §4.6).
//!
//! Construction is modeled on `huffmanTableImpl.cpp`'s `calcHuffmanTables`:
//! codes are assigned in increasing numeric order within each bit length,
//! and the decoder holds, per length, the `(min_code, max_code)` range plus
//! a base index into an `ordered_values` array — so decoding a code is a
//! linear scan over lengths rather than a binary trie.

use crate::error::{self, Result};
use rsdcm_core::stream::BitReader;

const MAX_CODE_LENGTH: usize = 16;

/// A canonical Huffman table, usable for either decoding (table-driven,
/// min/max-per-length) or encoding (direct value -> (code, length) lookup).
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// `min_code[len]` / `max_code[len]`: the numeric code range assigned to
    /// length `len` (1-16). `-1` marks a length with no codes.
    min_code: [i32; MAX_CODE_LENGTH + 1],
    max_code: [i32; MAX_CODE_LENGTH + 1],
    /// Index into `ordered_values` of the first value at each length.
    val_ptr: [usize; MAX_CODE_LENGTH + 1],
    /// Values in canonical order: all length-1 values, then length-2, ...
    ordered_values: Vec<u8>,
    /// Encoder lookup: value -> (code, length). Empty on a decode-only table.
    encode_table: Vec<Option<(u32, u8)>>,
}

impl HuffmanTable {
    /// Builds a decode table from the 16 per-length counts and the ordered
    /// value list exactly as they appear after a `DHT` marker's length
    /// bytes.
    pub fn from_counts(bits: &[u8; MAX_CODE_LENGTH], values: &[u8]) -> Result<Self> {
        let mut min_code = [-1i32; MAX_CODE_LENGTH + 1];
        let mut max_code = [-1i32; MAX_CODE_LENGTH + 1];
        let mut val_ptr = [0usize; MAX_CODE_LENGTH + 1];

        let mut code: u32 = 0;
        let mut value_index = 0usize;
        for len in 1..=MAX_CODE_LENGTH {
            let count = bits[len - 1] as usize;
            if count > 0 {
                if value_index + count > values.len() {
                    return error::CorruptedFileSnafu { reason: "huffman table value count mismatch" }.fail();
                }
                val_ptr[len] = value_index;
                min_code[len] = code as i32;
                max_code[len] = (code + count as u32 - 1) as i32;
                value_index += count;
                code += count as u32;
            }
            code <<= 1;
        }

        Ok(HuffmanTable {
            min_code,
            max_code,
            val_ptr,
            ordered_values: values[..value_index].to_vec(),
            encode_table: Vec::new(),
        })
    }

    /// Builds a length-limited canonical table from a value-frequency
    /// histogram (spec §4.6: "derive code lengths bounded by 16, then
    /// derive the canonical Huffman code per value"). Also returns the
    /// `(bits[16], values)` pair in the shape a `DHT` marker would carry,
    /// for the encoder to emit.
    pub fn from_frequencies(freq: &[u64], max_length: usize) -> (Self, [u8; 16], Vec<u8>) {
        debug_assert!(max_length <= MAX_CODE_LENGTH);
        let n = freq.len();
        // Package-merge style length assignment: repeatedly combine the two
        // least-frequent live symbols, bumping every symbol on either side's
        // chain one length deeper. A sentinel symbol with frequency 1 is
        // added so that a single-symbol alphabet still gets a 1-bit code,
        // matching `calcHuffmanCodesLength`'s handling of the all-zero tail.
        let mut freq: Vec<u64> = freq.to_vec();
        freq.push(1);
        let sentinel = freq.len() - 1;

        let mut code_length = vec![0u32; freq.len()];
        let mut next: Vec<Option<usize>> = vec![None; freq.len()];
        let mut live: Vec<(u64, usize)> =
            freq.iter().enumerate().filter(|(_, &f)| f > 0).map(|(i, &f)| (f, i)).collect();
        live.sort_by_key(|&(f, i)| (f, i));

        while live.len() > 1 {
            live.sort_by_key(|&(f, i)| (f, i));
            let (f0, v0) = live.remove(0);
            let (f1, v1) = live.remove(0);
            // Bump the code length of every symbol chained under v0 and v1.
            let mut cur = v0;
            loop {
                code_length[cur] += 1;
                match next[cur] {
                    Some(n) => cur = n,
                    None => break,
                }
            }
            next[cur] = Some(v1);
            let mut cur = v1;
            loop {
                code_length[cur] += 1;
                match next[cur] {
                    Some(n) => cur = n,
                    None => break,
                }
            }
            live.push((f0 + f1, v0));
        }

        // Tally lengths, dropping the sentinel once it has served its
        // purpose of giving a lone real symbol a non-zero length.
        let mut values_per_length = vec![0u32; MAX_CODE_LENGTH + 2];
        for (sym, &len) in code_length.iter().enumerate() {
            if len > 0 && sym != sentinel {
                values_per_length[len as usize] += 1;
            }
        }
        // If the sentinel ended up at some length and no real symbol shares
        // it, real symbols were already accounted for above; the sentinel
        // itself is simply never emitted.

        // Length-limit to `max_length` using the standard redistribution:
        // move two codes from an over-long length to length-1, and bump a
        // single shorter code into the slot freed up one level below the
        // limit (mirrors `huffmanTableImpl.cpp`'s reduction loop).
        for len in (max_length + 1..values_per_length.len()).rev() {
            while values_per_length[len] > 0 {
                let mut shorter = len - 2;
                while shorter > 0 && values_per_length[shorter] == 0 {
                    shorter -= 1;
                }
                if shorter == 0 {
                    break;
                }
                values_per_length[len] -= 2;
                values_per_length[len - 1] += 1;
                values_per_length[shorter + 1] += 2;
                values_per_length[shorter] -= 1;
            }
        }
        values_per_length.truncate(max_length + 1);

        // Order values by ascending code length, ascending symbol within a
        // length (this is what makes the table canonical).
        let mut by_length: Vec<Vec<u8>> = vec![Vec::new(); max_length + 1];
        let mut ordered_syms: Vec<usize> = code_length
            .iter()
            .enumerate()
            .filter(|&(sym, &len)| len > 0 && sym != sentinel)
            .map(|(sym, _)| sym)
            .collect();
        ordered_syms.sort_by_key(|&sym| (code_length[sym], sym));
        // Re-flow the length-limited counts over the sorted symbol list:
        // the exact symbol <-> length assignment after limiting no longer
        // matches `code_length` one-to-one, so symbols are handed out in
        // frequency order to the limited length buckets directly.
        ordered_syms.sort_by_key(|&sym| std::cmp::Reverse(freq[sym]));
        let mut iter = ordered_syms.into_iter();
        for len in 1..=max_length {
            for _ in 0..values_per_length[len] {
                if let Some(sym) = iter.next() {
                    by_length[len].push(sym as u8);
                }
            }
        }

        let mut bits = [0u8; 16];
        let mut values = Vec::new();
        for len in 1..=max_length {
            bits[len - 1] = by_length[len].len() as u8;
            values.extend_from_slice(&by_length[len]);
        }

        let mut table = HuffmanTable::from_counts(&bits, &values).expect("internally built table is well-formed");
        table.build_encode_table(n);
        (table, bits, values)
    }

    fn build_encode_table(&mut self, num_values: usize) {
        let mut encode_table = vec![None; num_values];
        let mut code: u32 = 0;
        let mut idx = 0usize;
        for len in 1..=MAX_CODE_LENGTH {
            if self.min_code[len] < 0 {
                code <<= 1;
                continue;
            }
            let count = (self.max_code[len] - self.min_code[len] + 1) as usize;
            for _ in 0..count {
                let value = self.ordered_values[idx] as usize;
                if value < encode_table.len() {
                    encode_table[value] = Some((code, len as u8));
                }
                idx += 1;
                code += 1;
            }
            code <<= 1;
        }
        self.encode_table = encode_table;
    }

    /// Decodes one Huffman symbol from the entropy stream.
    pub fn decode(&self, reader: &mut BitReader) -> Result<u8> {
        let mut code = reader.read_bits(1)? as i32;
        let mut len = 1usize;
        loop {
            if len > MAX_CODE_LENGTH {
                return error::CorruptedFileSnafu { reason: "invalid huffman code in entropy stream" }.fail();
            }
            if self.max_code[len] >= 0 && code <= self.max_code[len] {
                let offset = (code - self.min_code[len]) as usize;
                return Ok(self.ordered_values[self.val_ptr[len] + offset]);
            }
            code = (code << 1) | reader.read_bits(1)? as i32;
            len += 1;
        }
    }

    /// Looks up the `(code, length)` pair to emit for `value`. Returns
    /// `None` for a value never seen while building this table from
    /// frequencies, matching spec §4.6 ("a value never emitted must not be
    /// assigned a code").
    pub fn code_for(&self, value: u8) -> Option<(u32, u8)> {
        self.encode_table.get(value as usize).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use rsdcm_core::stream::StreamView;

    #[test]
    fn round_trips_through_encode_and_decode() {
        let mut freq = vec![0u64; 16];
        freq[0] = 10;
        freq[1] = 5;
        freq[2] = 3;
        freq[5] = 1;
        let (table, _bits, _values) = HuffmanTable::from_frequencies(&freq, 16);

        let mut writer = crate::bitwriter::BitWriter::new();
        let symbols = [0u8, 1, 2, 5, 0, 0, 1];
        for &s in &symbols {
            let (code, len) = table.code_for(s).expect("symbol was seen");
            writer.write_bits(code, len);
        }
        let bytes = writer.into_bytes();

        let mut view = StreamView::new_seekable(Cursor::new(bytes), None).unwrap();
        let mut reader = BitReader::new(&mut view);
        for &s in &symbols {
            assert_eq!(table.decode(&mut reader).unwrap(), s);
        }
    }

    #[test]
    fn single_symbol_alphabet_gets_a_code() {
        let mut freq = vec![0u64; 4];
        freq[3] = 42;
        let (table, bits, values) = HuffmanTable::from_frequencies(&freq, 16);
        assert_eq!(values, vec![3]);
        assert_eq!(bits.iter().sum::<u8>(), 1);
        assert!(table.code_for(3).is_some());
    }

    #[test]
    fn from_counts_rejects_truncated_value_list() {
        let bits = {
            let mut b = [0u8; 16];
            b[0] = 2;
            b
        };
        let err = HuffmanTable::from_counts(&bits, &[1]);
        assert!(err.is_err());
    }
}
