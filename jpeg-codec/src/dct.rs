//! The forward and inverse 8x8 DCT, both integer and both scaled so the
//! scaling folds into the quantization tables built in [`crate::quant`]
//! (spec §4.6 "DCT"). The forward transform is AA&N (Arai-Agui-Nakajima);
//! the inverse is the Loeffler-Ligtenberg-Moschytz factorization, the same
//! pairing `jpegCodecBaseImpl.cpp` uses.

const CONST_BITS: i32 = 13;
const PASS1_BITS: i32 = 2;

const FIX_0_298631336: i32 = 2446;
const FIX_0_390180644: i32 = 3196;
const FIX_0_541196100: i32 = 4433;
const FIX_0_765366865: i32 = 6270;
const FIX_0_899976223: i32 = 7373;
const FIX_1_175875602: i32 = 9633;
const FIX_1_501321110: i32 = 12299;
const FIX_1_847759065: i32 = 15137;
const FIX_1_961570560: i32 = 16069;
const FIX_2_053119869: i32 = 16819;
const FIX_2_562915447: i32 = 20995;
const FIX_3_072711026: i32 = 25172;

fn descale(x: i32, shift: i32) -> i32 {
    (x + (1 << (shift - 1))) >> shift
}

/// Scaled inverse DCT (Loeffler/Ligtenberg/Moschytz), operating on a
/// dequantized natural-order block in place.
///
/// The input is expected to already carry the Q14 dequantization scale
/// from [`crate::quant::build_decompression_table`]; this transform
/// removes that fixed-point factor in its final right-shift, leaving
/// sample-domain values.
pub fn idct_8x8(block: &mut [i32; 64]) {
    let mut workspace = [0i32; 64];

    for col in 0..8 {
        let c = |r: usize| block[r * 8 + col];
        if c(1) == 0 && c(2) == 0 && c(3) == 0 && c(4) == 0 && c(5) == 0 && c(6) == 0 && c(7) == 0 {
            let dc = c(0) << PASS1_BITS;
            for r in 0..8 {
                workspace[r * 8 + col] = dc;
            }
            continue;
        }

        let z2 = c(2);
        let z3 = c(6);
        let z1 = (z2 + z3) * FIX_0_541196100;
        let tmp2 = z1 + z3 * -FIX_1_847759065;
        let tmp3 = z1 + z2 * FIX_0_765366865;

        let z2 = c(0);
        let z3 = c(4);
        let tmp0 = (z2 + z3) << CONST_BITS;
        let tmp1 = (z2 - z3) << CONST_BITS;

        let tmp10 = tmp0 + tmp3;
        let tmp13 = tmp0 - tmp3;
        let tmp11 = tmp1 + tmp2;
        let tmp12 = tmp1 - tmp2;

        let t0 = c(7);
        let t1 = c(5);
        let t2 = c(3);
        let t3 = c(1);

        let z1 = t0 + t3;
        let z2 = t1 + t2;
        let z3 = t0 + t2;
        let z4 = t1 + t3;
        let z5 = (z3 + z4) * FIX_1_175875602;

        let t0 = t0 * FIX_0_298631336;
        let t1 = t1 * FIX_2_053119869;
        let t2 = t2 * FIX_3_072711026;
        let t3 = t3 * FIX_1_501321110;
        let z1 = z1 * -FIX_0_899976223;
        let z2 = z2 * -FIX_2_562915447;
        let z3 = z3 * -FIX_1_961570560 + z5;
        let z4 = z4 * -FIX_0_390180644 + z5;

        let t0 = t0 + z1 + z3;
        let t1 = t1 + z2 + z4;
        let t2 = t2 + z2 + z3;
        let t3 = t3 + z1 + z4;

        workspace[0 * 8 + col] = descale(tmp10 + t3, CONST_BITS - PASS1_BITS);
        workspace[7 * 8 + col] = descale(tmp10 - t3, CONST_BITS - PASS1_BITS);
        workspace[1 * 8 + col] = descale(tmp11 + t2, CONST_BITS - PASS1_BITS);
        workspace[6 * 8 + col] = descale(tmp11 - t2, CONST_BITS - PASS1_BITS);
        workspace[2 * 8 + col] = descale(tmp12 + t1, CONST_BITS - PASS1_BITS);
        workspace[5 * 8 + col] = descale(tmp12 - t1, CONST_BITS - PASS1_BITS);
        workspace[3 * 8 + col] = descale(tmp13 + t0, CONST_BITS - PASS1_BITS);
        workspace[4 * 8 + col] = descale(tmp13 - t0, CONST_BITS - PASS1_BITS);
    }

    for row in 0..8 {
        let r = |c: usize| workspace[row * 8 + c];

        let z2 = r(2);
        let z3 = r(6);
        let z1 = (z2 + z3) * FIX_0_541196100;
        let tmp2 = z1 + z3 * -FIX_1_847759065;
        let tmp3 = z1 + z2 * FIX_0_765366865;

        let z2 = r(0);
        let z3 = r(4);
        let tmp0 = (z2 + z3) << CONST_BITS;
        let tmp1 = (z2 - z3) << CONST_BITS;

        let tmp10 = tmp0 + tmp3;
        let tmp13 = tmp0 - tmp3;
        let tmp11 = tmp1 + tmp2;
        let tmp12 = tmp1 - tmp2;

        let t0 = r(7);
        let t1 = r(5);
        let t2 = r(3);
        let t3 = r(1);

        let z1 = t0 + t3;
        let z2 = t1 + t2;
        let z3 = t0 + t2;
        let z4 = t1 + t3;
        let z5 = (z3 + z4) * FIX_1_175875602;

        let t0 = t0 * FIX_0_298631336;
        let t1 = t1 * FIX_2_053119869;
        let t2 = t2 * FIX_3_072711026;
        let t3 = t3 * FIX_1_501321110;
        let z1 = z1 * -FIX_0_899976223;
        let z2 = z2 * -FIX_2_562915447;
        let z3 = z3 * -FIX_1_961570560 + z5;
        let z4 = z4 * -FIX_0_390180644 + z5;

        let t0 = t0 + z1 + z3;
        let t1 = t1 + z2 + z4;
        let t2 = t2 + z2 + z3;
        let t3 = t3 + z1 + z4;

        block[row * 8 + 0] = descale(tmp10 + t3, CONST_BITS + PASS1_BITS + 3);
        block[row * 8 + 7] = descale(tmp10 - t3, CONST_BITS + PASS1_BITS + 3);
        block[row * 8 + 1] = descale(tmp11 + t2, CONST_BITS + PASS1_BITS + 3);
        block[row * 8 + 6] = descale(tmp11 - t2, CONST_BITS + PASS1_BITS + 3);
        block[row * 8 + 2] = descale(tmp12 + t1, CONST_BITS + PASS1_BITS + 3);
        block[row * 8 + 5] = descale(tmp12 - t1, CONST_BITS + PASS1_BITS + 3);
        block[row * 8 + 3] = descale(tmp13 + t0, CONST_BITS + PASS1_BITS + 3);
        block[row * 8 + 4] = descale(tmp13 - t0, CONST_BITS + PASS1_BITS + 3);
    }
}

const FDCT_CONST_BITS: i32 = 13;
const FDCT_PASS1_BITS: i32 = 2;

/// AA&N-scaled forward DCT, operating on a sample-domain block (values
/// already level-shifted by the caller) in place. The result carries a
/// scale factor absorbed by [`crate::quant::build_compression_table`].
pub fn fdct_8x8(block: &mut [i32; 64]) {
    let mut workspace = [0i32; 64];

    for row in 0..8 {
        let d = |c: usize| block[row * 8 + c] as i64;

        let tmp0 = d(0) + d(7);
        let tmp7 = d(0) - d(7);
        let tmp1 = d(1) + d(6);
        let tmp6 = d(1) - d(6);
        let tmp2 = d(2) + d(5);
        let tmp5 = d(2) - d(5);
        let tmp3 = d(3) + d(4);
        let tmp4 = d(3) - d(4);

        let tmp10 = tmp0 + tmp3;
        let tmp13 = tmp0 - tmp3;
        let tmp11 = tmp1 + tmp2;
        let tmp12 = tmp1 - tmp2;

        workspace[row * 8 + 0] = ((tmp10 + tmp11) << FDCT_PASS1_BITS) as i32;
        workspace[row * 8 + 4] = ((tmp10 - tmp11) << FDCT_PASS1_BITS) as i32;

        let z1 = (tmp12 + tmp13) * FIX_0_541196100 as i64;
        workspace[row * 8 + 2] =
            fdct_descale(z1 + tmp13 * FIX_0_765366865 as i64, FDCT_CONST_BITS - FDCT_PASS1_BITS);
        workspace[row * 8 + 6] =
            fdct_descale(z1 - tmp12 * FIX_1_847759065 as i64, FDCT_CONST_BITS - FDCT_PASS1_BITS);

        let z1 = tmp4 + tmp7;
        let z2 = tmp5 + tmp6;
        let z3 = tmp4 + tmp6;
        let z4 = tmp5 + tmp7;
        let z5 = (z3 + z4) * FIX_1_175875602 as i64;

        let tmp4s = tmp4 * FIX_0_298631336 as i64;
        let tmp5s = tmp5 * FIX_2_053119869 as i64;
        let tmp6s = tmp6 * FIX_3_072711026 as i64;
        let tmp7s = tmp7 * FIX_1_501321110 as i64;
        let z1 = z1 * -FIX_0_899976223 as i64;
        let z2 = z2 * -FIX_2_562915447 as i64;
        let z3 = z3 * -FIX_1_961570560 as i64 + z5;
        let z4 = z4 * -FIX_0_390180644 as i64 + z5;

        workspace[row * 8 + 7] = fdct_descale(tmp4s + z1 + z3, FDCT_CONST_BITS - FDCT_PASS1_BITS);
        workspace[row * 8 + 5] = fdct_descale(tmp5s + z2 + z4, FDCT_CONST_BITS - FDCT_PASS1_BITS);
        workspace[row * 8 + 3] = fdct_descale(tmp6s + z2 + z3, FDCT_CONST_BITS - FDCT_PASS1_BITS);
        workspace[row * 8 + 1] = fdct_descale(tmp7s + z1 + z4, FDCT_CONST_BITS - FDCT_PASS1_BITS);
    }

    for col in 0..8 {
        let d = |r: usize| workspace[r * 8 + col] as i64;

        let tmp0 = d(0) + d(7);
        let tmp7 = d(0) - d(7);
        let tmp1 = d(1) + d(6);
        let tmp6 = d(1) - d(6);
        let tmp2 = d(2) + d(5);
        let tmp5 = d(2) - d(5);
        let tmp3 = d(3) + d(4);
        let tmp4 = d(3) - d(4);

        let tmp10 = tmp0 + tmp3;
        let tmp13 = tmp0 - tmp3;
        let tmp11 = tmp1 + tmp2;
        let tmp12 = tmp1 - tmp2;

        block[0 * 8 + col] = fdct_descale(tmp10 + tmp11, FDCT_PASS1_BITS);
        block[4 * 8 + col] = fdct_descale(tmp10 - tmp11, FDCT_PASS1_BITS);

        let z1 = (tmp12 + tmp13) * FIX_0_541196100 as i64;
        block[2 * 8 + col] =
            fdct_descale(z1 + tmp13 * FIX_0_765366865 as i64, FDCT_CONST_BITS + FDCT_PASS1_BITS);
        block[6 * 8 + col] =
            fdct_descale(z1 - tmp12 * FIX_1_847759065 as i64, FDCT_CONST_BITS + FDCT_PASS1_BITS);

        let z1 = tmp4 + tmp7;
        let z2 = tmp5 + tmp6;
        let z3 = tmp4 + tmp6;
        let z4 = tmp5 + tmp7;
        let z5 = (z3 + z4) * FIX_1_175875602 as i64;

        let tmp4s = tmp4 * FIX_0_298631336 as i64;
        let tmp5s = tmp5 * FIX_2_053119869 as i64;
        let tmp6s = tmp6 * FIX_3_072711026 as i64;
        let tmp7s = tmp7 * FIX_1_501321110 as i64;
        let z1 = z1 * -FIX_0_899976223 as i64;
        let z2 = z2 * -FIX_2_562915447 as i64;
        let z3 = z3 * -FIX_1_961570560 as i64 + z5;
        let z4 = z4 * -FIX_0_390180644 as i64 + z5;

        block[7 * 8 + col] = fdct_descale(tmp4s + z1 + z3, FDCT_CONST_BITS + FDCT_PASS1_BITS);
        block[5 * 8 + col] = fdct_descale(tmp5s + z2 + z4, FDCT_CONST_BITS + FDCT_PASS1_BITS);
        block[3 * 8 + col] = fdct_descale(tmp6s + z2 + z3, FDCT_CONST_BITS + FDCT_PASS1_BITS);
        block[1 * 8 + col] = fdct_descale(tmp7s + z1 + z4, FDCT_CONST_BITS + FDCT_PASS1_BITS);
    }
}

fn fdct_descale(x: i64, shift: i32) -> i32 {
    ((x + (1i64 << (shift - 1))) >> shift) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_only_block_idct_is_constant() {
        let mut block = [0i32; 64];
        block[0] = 1 << 16;
        idct_8x8(&mut block);
        let first = block[0];
        assert!(block.iter().all(|&v| v == first));
    }

    #[test]
    fn fdct_of_flat_block_has_no_ac_energy() {
        let mut block = [5i32; 64];
        fdct_8x8(&mut block);
        assert!(block[1..].iter().all(|&v| v == 0));
    }
}
