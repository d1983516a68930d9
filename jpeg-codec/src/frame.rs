//! The "JPEG information block": everything parsed out of `SOF`/`SOS`/`DQT`/
//! `DHT`/`DRI` that a scan decode or encode needs (spec §3, §4.6). Mirrors
//! the shape of Imebra's `jpegCodecBaseImpl.h` frame/channel state, minus
//! the progressive-scan bookkeeping this implementation doesn't support.

use crate::huffman::HuffmanTable;

/// One image component (channel) as declared in the `SOF` segment.
#[derive(Debug, Clone)]
pub struct Component {
    pub id: u8,
    /// Horizontal sampling factor, 1-4.
    pub h_sampling: u8,
    /// Vertical sampling factor, 1-4.
    pub v_sampling: u8,
    pub quant_table_index: u8,

    /// Set while parsing the `SOS` segment for the scan that uses this
    /// channel.
    pub dc_table_index: u8,
    pub ac_table_index: u8,
    /// Running DC predictor, reset at the start of a scan and at every
    /// restart marker (spec §4.6 "Restart handling").
    pub last_dc_value: i32,
}

/// The decoded `SOF` segment plus the quantization/Huffman tables it
/// references, assembled incrementally as `DQT`/`DHT`/`DRI` segments are
/// read ahead of the `SOS` that starts the scan.
#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub sof_marker: u8,
    pub precision: u8,
    pub height: u16,
    pub width: u16,
    pub components: Vec<Component>,

    /// Raw (unscaled) quantization tables, indexed 0-3, natural order.
    pub quant_tables: [Option<[u16; 64]>; 4],
    /// Precomputed decompression-scale tables, lazily built from
    /// `quant_tables` by the caller once it knows it's decoding.
    pub quant_tables_decompression: [Option<[i32; 64]>; 4],
    /// Precomputed compression-scale tables, built once an encoder picks a
    /// quality preset.
    pub quant_tables_compression: [Option<[i32; 64]>; 4],

    pub dc_tables: [Option<HuffmanTable>; 4],
    pub ac_tables: [Option<HuffmanTable>; 4],

    /// Restart interval in MCUs; `0` means no restart markers.
    pub restart_interval: u16,
}

impl FrameHeader {
    pub fn new(sof_marker: u8, precision: u8, height: u16, width: u16, components: Vec<Component>) -> Self {
        FrameHeader {
            sof_marker,
            precision,
            height,
            width,
            components,
            quant_tables: Default::default(),
            quant_tables_decompression: Default::default(),
            quant_tables_compression: Default::default(),
            dc_tables: Default::default(),
            ac_tables: Default::default(),
            restart_interval: 0,
        }
    }

    pub fn is_lossless(&self) -> bool {
        matches!(self.sof_marker, crate::marker::SOF3)
    }

    /// Max sampling factors across all components, used to size the MCU
    /// grid (spec §4.6 "MCU/scan structure").
    pub fn max_sampling(&self) -> (u8, u8) {
        let h = self.components.iter().map(|c| c.h_sampling).max().unwrap_or(1);
        let v = self.components.iter().map(|c| c.v_sampling).max().unwrap_or(1);
        (h, v)
    }

    pub fn mcus_per_row(&self) -> u32 {
        let (h_max, _) = self.max_sampling();
        let mcu_width = 8 * h_max as u32;
        (self.width as u32 + mcu_width - 1) / mcu_width
    }

    pub fn mcus_per_column(&self) -> u32 {
        let (_, v_max) = self.max_sampling();
        let mcu_height = 8 * v_max as u32;
        (self.height as u32 + mcu_height - 1) / mcu_height
    }
}

/// Spectral-selection / predictor range declared by the `SOS` segment. Only
/// `predictor` is meaningful for the lossless profiles this crate supports;
/// the rest exists so a scan header parses symmetrically with a fuller
/// implementation.
#[derive(Debug, Clone, Copy)]
pub struct ScanHeader {
    pub predictor: u8,
    pub point_transform: u8,
}
