//! Quantization tables: the standard zigzag order, the default
//! luminance/chrominance tables, quality-based scaling, and the
//! fixed-point compression/decompression scale tables (spec §4.6).

/// Maps a zigzag-ordered coefficient index to its natural (row-major)
/// position in an 8x8 block.
pub const ZIGZAG: [usize; 64] = [
    0, 1, 8, 16, 9, 2, 3, 10, 17, 24, 32, 25, 18, 11, 4, 5, 12, 19, 26, 33, 40, 48, 41, 34, 27, 20,
    13, 6, 7, 14, 21, 28, 35, 42, 49, 56, 57, 50, 43, 36, 29, 22, 15, 23, 30, 37, 44, 51, 58, 59,
    52, 45, 38, 31, 39, 46, 53, 60, 61, 54, 47, 55, 62, 63,
];

/// The Annex K standard luminance quantization table, natural order.
pub const STD_LUMINANCE: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, 12, 12, 14, 19, 26, 58, 60, 55, 14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62, 18, 22, 37, 56, 68, 109, 103, 77, 24, 35, 55, 64, 81, 104, 113,
    92, 49, 64, 78, 87, 103, 121, 120, 101, 72, 92, 95, 98, 112, 100, 103, 99,
];

/// The Annex K standard chrominance quantization table, natural order.
pub const STD_CHROMINANCE: [u16; 64] = [
    17, 18, 24, 47, 99, 99, 99, 99, 18, 21, 26, 66, 99, 99, 99, 99, 24, 26, 56, 99, 99, 99, 99, 99,
    47, 66, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99, 99,
];

/// The quality presets named in spec §4.6; `Medium` is the scale-factor-1
/// anchor the other presets are expressed relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityPreset {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl QualityPreset {
    /// The classic IJG quality percentage (0-100) this preset maps to.
    pub fn percent(self) -> u32 {
        match self {
            QualityPreset::VeryHigh => 95,
            QualityPreset::High => 85,
            QualityPreset::Medium => 50,
            QualityPreset::Low => 25,
            QualityPreset::VeryLow => 10,
        }
    }

    /// Scales a standard table by this preset's quality percentage, using
    /// the conventional IJG scaling formula (`Q/medium` per spec §4.6, with
    /// `medium` pinned at the standard 50% anchor).
    pub fn scale_table(self, base: &[u16; 64]) -> [u16; 64] {
        scale_table_for_quality(base, self.percent())
    }
}

/// Scales a base quantization table for an arbitrary 1-100 quality value,
/// clamping every entry to `[1, 255]` as the JPEG standard requires.
pub fn scale_table_for_quality(base: &[u16; 64], quality: u32) -> [u16; 64] {
    let quality = quality.clamp(1, 100);
    let scale = if quality < 50 { 5000 / quality } else { 200 - quality * 2 };
    let mut out = [0u16; 64];
    for (i, &b) in base.iter().enumerate() {
        let v = (b as u32 * scale + 50) / 100;
        out[i] = v.clamp(1, 255) as u16;
    }
    out
}

/// `idct_scale[k] = cos(k*pi/16) * sqrt(2 for k>0 else 1) / 2`, the scale
/// factors the Loeffler IDCT folds into its quantization table (spec §4.6,
/// "decompression is `q * idctScale[row] * idctScale[col] << 14`").
/// Represented directly as the already-fixed-point Q14 per-entry multiplier
/// a row times a column index produces.
fn idct_scale_q14() -> [f64; 8] {
    let mut s = [0f64; 8];
    for (k, slot) in s.iter_mut().enumerate() {
        let cu = if k == 0 { 1.0 / std::f64::consts::SQRT_2 } else { 1.0 };
        *slot = cu;
    }
    s
}

fn fdct_scale() -> [f64; 8] {
    idct_scale_q14()
}

/// A quantization table prepared for decompression: `decompression[i] = q[i]
/// * idctScale[row] * idctScale[col]`, stored as an `i32` Q14 fixed-point
/// multiplier so the integer IDCT can dequantize with a single multiply.
pub fn build_decompression_table(q_natural: &[u16; 64]) -> [i32; 64] {
    let scale = idct_scale_q14();
    let mut out = [0i32; 64];
    for row in 0..8 {
        for col in 0..8 {
            let idx = row * 8 + col;
            let factor = scale[row] * scale[col];
            out[idx] = ((q_natural[idx] as f64) * factor * (1i64 << 14) as f64).round() as i32;
        }
    }
    out
}

/// A quantization table prepared for compression:
/// `compression[i] = 1 / (q[i] * fdctScale[row] * fdctScale[col])`, stored
/// Q14 so the integer FDCT can quantize with a single multiply-and-shift.
pub fn build_compression_table(q_natural: &[u16; 64]) -> [i32; 64] {
    let scale = fdct_scale();
    let mut out = [0i32; 64];
    for row in 0..8 {
        for col in 0..8 {
            let idx = row * 8 + col;
            let factor = scale[row] * scale[col];
            let denom = (q_natural[idx] as f64) * factor;
            out[idx] = ((1.0 / denom) * (1i64 << 14) as f64).round() as i32;
        }
    }
    out
}

/// De-zigzags a 64-entry block (coefficient order -> natural row-major
/// order), per spec §4.6 ("Values are stored de-zig-zagged").
pub fn dezigzag(input: &[i32; 64]) -> [i32; 64] {
    let mut out = [0i32; 64];
    for (zz, &natural_idx) in ZIGZAG.iter().enumerate() {
        out[natural_idx] = input[zz];
    }
    out
}

/// Zigzags a natural-order block back to coefficient scan order, the
/// inverse of [`dezigzag`], used by the encoder before Huffman coding.
pub fn zigzag(input: &[i32; 64]) -> [i32; 64] {
    let mut out = [0i32; 64];
    for (zz, &natural_idx) in ZIGZAG.iter().enumerate() {
        out[zz] = input[natural_idx];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zigzag_and_dezigzag_are_inverses() {
        let mut block = [0i32; 64];
        for (i, v) in block.iter_mut().enumerate() {
            *v = i as i32;
        }
        assert_eq!(dezigzag(&zigzag(&block)), block);
    }

    #[test]
    fn quality_scaling_clamps_to_valid_range() {
        let t = scale_table_for_quality(&STD_LUMINANCE, 100);
        assert!(t.iter().all(|&v| v >= 1));
        let t = scale_table_for_quality(&STD_LUMINANCE, 1);
        assert!(t.iter().all(|&v| v <= 255));
    }
}
