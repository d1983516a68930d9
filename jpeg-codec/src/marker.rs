//! JPEG marker constants and the big-endian primitives the frame/scan
//! parsers are built on (spec §4.6 "Marker machinery").

/// Start of Image.
pub const SOI: u8 = 0xD8;
/// End of Image.
pub const EOI: u8 = 0xD9;
/// Define Quantization Table(s).
pub const DQT: u8 = 0xDB;
/// Define Huffman Table(s).
pub const DHT: u8 = 0xC4;
/// Define Restart Interval.
pub const DRI: u8 = 0xDD;
/// Start of Scan.
pub const SOS: u8 = 0xDA;

/// Baseline sequential DCT.
pub const SOF0: u8 = 0xC0;
/// Extended sequential DCT.
pub const SOF1: u8 = 0xC1;
/// Progressive DCT (not supported; recognized only to reject cleanly).
pub const SOF2: u8 = 0xC2;
/// Lossless, sequential.
pub const SOF3: u8 = 0xC3;
/// Differential sequential DCT.
pub const SOF5: u8 = 0xC5;
/// Differential progressive DCT.
pub const SOF6: u8 = 0xC6;
/// Differential lossless.
pub const SOF7: u8 = 0xC7;
/// Extended sequential DCT, arithmetic coding.
pub const SOF9: u8 = 0xC9;
/// Progressive DCT, arithmetic coding.
pub const SOFA: u8 = 0xCA;
/// Lossless, arithmetic coding.
pub const SOFB: u8 = 0xCB;
/// Differential sequential DCT, arithmetic coding.
pub const SOFD: u8 = 0xCD;
/// Differential progressive DCT, arithmetic coding.
pub const SOFE: u8 = 0xCE;
/// Differential lossless, arithmetic coding.
pub const SOFF: u8 = 0xCF;

/// Restart markers `RST0..RST7`.
pub const RST0: u8 = 0xD0;
pub const RST7: u8 = 0xD7;

/// Whether `marker` is one of the SOF family (any process).
pub fn is_sof(marker: u8) -> bool {
    matches!(
        marker,
        SOF0 | SOF1 | SOF2 | SOF3 | SOF5 | SOF6 | SOF7 | SOF9 | SOFA | SOFB | SOFD | SOFE | SOFF
    )
}

pub fn is_rst(marker: u8) -> bool {
    (RST0..=RST7).contains(&marker)
}

pub fn rst_index(marker: u8) -> u8 {
    marker - RST0
}
