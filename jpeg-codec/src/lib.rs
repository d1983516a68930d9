//! A hand-rolled JPEG entropy coder and DCT, scoped to exactly the
//! profiles the DICOM transfer syntax table names: baseline (SOF0) and
//! extended (SOF1) lossy DCT, and lossless (SOF3) with its 8 predictors
//! (spec §4.6). No progressive, hierarchical, arithmetic-coded, or
//! JPEG 2000 support — those transfer syntaxes are registry stubs one
//! layer up, in the transfer syntax registry.

pub mod bitwriter;
pub mod dct;
pub mod error;
pub mod frame;
pub mod huffman;
pub mod lossless;
pub mod lossy;
pub mod marker;
pub mod quant;

use bitwriter::BitWriter;
use error::{self, Result};
use frame::{Component, FrameHeader};
use huffman::HuffmanTable;
use quant::QualityPreset;
use rsdcm_core::stream::{BitReader, StreamView};
use std::io::Cursor;

/// A fully decoded JPEG image: channel-interleaved, row-major samples,
/// sign-extended to `i32` regardless of source precision (mirrors the
/// shape `pixeldata::image::DecodedImage` expects upstream).
#[derive(Debug, Clone)]
pub struct JpegImage {
    pub width: u16,
    pub height: u16,
    pub precision: u8,
    pub samples_per_pixel: u8,
    /// `height * width * samples_per_pixel` entries, row-major,
    /// channel-interleaved.
    pub samples: Vec<i32>,
}

impl JpegImage {
    fn sample_mut(&mut self, channel: usize, row: usize, col: usize) -> &mut i32 {
        let idx = (row * self.width as usize + col) * self.samples_per_pixel as usize + channel;
        &mut self.samples[idx]
    }

    fn sample(&self, channel: usize, row: usize, col: usize) -> i32 {
        let idx = (row * self.width as usize + col) * self.samples_per_pixel as usize + channel;
        self.samples[idx]
    }
}

/// Decodes a complete JPEG stream (markers through `EOI`) into sample
/// data. Handles exactly one frame; a stream with more than one `SOF`
/// (hierarchical) is rejected.
pub fn decode(data: &[u8]) -> Result<JpegImage> {
    let mut view = StreamView::new_seekable(Cursor::new(data.to_vec()), Some(data.len() as u64))?;

    expect_marker(&mut view, marker::SOI)?;

    let mut frame: Option<FrameHeader> = None;
    let mut image: Option<JpegImage> = None;

    loop {
        let m = next_marker(&mut view)?;
        match m {
            marker::EOI => break,
            marker::DQT => read_dqt(&mut view, frame.as_mut())?,
            marker::DHT => read_dht(&mut view, frame.as_mut())?,
            marker::DRI => read_dri(&mut view, frame.as_mut())?,
            m if marker::is_sof(m) => {
                if frame.is_some() {
                    return error::JpegUnsupportedSnafu { what: "multiple SOF segments (hierarchical JPEG)" }.fail();
                }
                if m != marker::SOF0 && m != marker::SOF1 && m != marker::SOF3 {
                    tracing::warn!("rejecting unsupported SOF marker 0x{m:02X} (only baseline/extended/lossless are implemented)");
                    return error::JpegUnsupportedSnafu { what: format!("SOF marker 0x{m:02X}") }.fail();
                }
                let fh = read_sof(&mut view, m)?;
                image = Some(JpegImage {
                    width: fh.width,
                    height: fh.height,
                    precision: fh.precision,
                    samples_per_pixel: fh.components.len() as u8,
                    samples: vec![0i32; fh.width as usize * fh.height as usize * fh.components.len()],
                });
                frame = Some(fh);
            }
            marker::SOS => {
                let fh = frame.as_mut().ok_or_else(|| error::Error::CorruptedFile {
                    reason: "SOS before SOF".to_string(),
                })?;
                let img = image.as_mut().expect("frame and image are set together");
                decode_scan(&mut view, fh, img)?;
            }
            _ => skip_segment(&mut view)?,
        }
    }

    image.ok_or_else(|| error::Error::CorruptedFile { reason: "no SOF segment found".to_string() })
}

fn expect_marker(view: &mut StreamView, expected: u8) -> Result<()> {
    let m = next_marker(view)?;
    if m != expected {
        return error::CorruptedFileSnafu { reason: format!("expected marker 0x{expected:02X}, got 0x{m:02X}") }.fail();
    }
    Ok(())
}

fn read_u8(view: &mut StreamView) -> Result<u8> {
    let mut b = [0u8; 1];
    view.read_fully(&mut b)?;
    Ok(b[0])
}

fn read_u16(view: &mut StreamView) -> Result<u16> {
    let mut b = [0u8; 2];
    view.read_fully(&mut b)?;
    Ok(u16::from_be_bytes(b))
}

/// Scans forward until a `0xFF xx` marker is found (skipping any fill
/// bytes), returning the marker byte `xx`.
fn next_marker(view: &mut StreamView) -> Result<u8> {
    loop {
        let mut b = [0u8; 1];
        view.read_fully(&mut b)?;
        if b[0] != 0xFF {
            continue;
        }
        loop {
            view.read_fully(&mut b)?;
            if b[0] != 0xFF {
                break;
            }
        }
        if b[0] != 0x00 {
            return Ok(b[0]);
        }
    }
}

fn skip_segment(view: &mut StreamView) -> Result<()> {
    let len = read_u16(view)?;
    if len < 2 {
        return error::CorruptedFileSnafu { reason: "segment length shorter than its own header" }.fail();
    }
    view.skip((len - 2) as u64)?;
    Ok(())
}

fn read_sof(view: &mut StreamView, marker_byte: u8) -> Result<FrameHeader> {
    let _len = read_u16(view)?;
    let precision = read_u8(view)?;
    let height = read_u16(view)?;
    let width = read_u16(view)?;
    let count = read_u8(view)?;
    let mut components = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let id = read_u8(view)?;
        let sampling = read_u8(view)?;
        let quant_table_index = read_u8(view)?;
        components.push(Component {
            id,
            h_sampling: sampling >> 4,
            v_sampling: sampling & 0x0F,
            quant_table_index,
            dc_table_index: 0,
            ac_table_index: 0,
            // Lossy DC prediction starts at 0; a lossless scan reseeds this
            // to the frame default (`half`) itself at scan start, matching
            // Imebra's `m_defaultDCValue` split (lossless-only half-range
            // default, 0 for every other profile).
            last_dc_value: 0,
        });
    }
    Ok(FrameHeader::new(marker_byte, precision, height, width, components))
}

fn read_dqt(view: &mut StreamView, frame: Option<&mut FrameHeader>) -> Result<()> {
    let len = read_u16(view)?;
    let mut remaining = len as i32 - 2;
    while remaining > 0 {
        let pq_tq = read_u8(view)?;
        let precision16 = pq_tq >> 4 != 0;
        let index = (pq_tq & 0x0F) as usize;
        remaining -= 1;
        let mut table = [0u16; 64];
        for slot in table.iter_mut() {
            *slot = if precision16 { read_u16(view)? } else { read_u8(view)? as u16 };
            remaining -= if precision16 { 2 } else { 1 };
        }
        let natural = quant::dezigzag(&table.map(|v| v as i32)).map(|v| v as u16);
        if let Some(fh) = frame.as_deref_mut() {
            if index < 4 {
                fh.quant_tables[index] = Some(natural);
            }
        }
    }
    Ok(())
}

fn read_dht(view: &mut StreamView, frame: Option<&mut FrameHeader>) -> Result<()> {
    let len = read_u16(view)?;
    let mut remaining = len as i32 - 2;
    while remaining > 0 {
        let tc_th = read_u8(view)?;
        let is_ac = tc_th >> 4 != 0;
        let index = (tc_th & 0x0F) as usize;
        remaining -= 1;
        let mut counts = [0u8; 16];
        for c in counts.iter_mut() {
            *c = read_u8(view)?;
            remaining -= 1;
        }
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        let mut values = vec![0u8; total];
        view.read_fully(&mut values)?;
        remaining -= total as i32;
        let table = HuffmanTable::from_counts(&counts, &values)?;
        if let Some(fh) = frame.as_deref_mut() {
            if index < 4 {
                if is_ac {
                    fh.ac_tables[index] = Some(table);
                } else {
                    fh.dc_tables[index] = Some(table);
                }
            }
        }
    }
    Ok(())
}

fn read_dri(view: &mut StreamView, frame: Option<&mut FrameHeader>) -> Result<()> {
    let _len = read_u16(view)?;
    let interval = read_u16(view)?;
    if let Some(fh) = frame {
        fh.restart_interval = interval;
    }
    Ok(())
}

/// Reads the `SOS` header, assigns each scan component its DC/AC table
/// indices and (for lossless scans) its predictor, then decodes every
/// MCU up to the next marker.
fn decode_scan(view: &mut StreamView, frame: &mut FrameHeader, image: &mut JpegImage) -> Result<()> {
    let _len = read_u16(view)?;
    let n = read_u8(view)?;
    let mut scan_components: Vec<usize> = Vec::with_capacity(n as usize);
    for _ in 0..n {
        let id = read_u8(view)?;
        let td_ta = read_u8(view)?;
        let pos = frame
            .components
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| error::Error::CorruptedFile { reason: "SOS references unknown component id".to_string() })?;
        frame.components[pos].dc_table_index = td_ta >> 4;
        frame.components[pos].ac_table_index = td_ta & 0x0F;
        scan_components.push(pos);
    }
    let spectral_start = read_u8(view)?;
    let spectral_end = read_u8(view)?;
    let ah_al = read_u8(view)?;
    let predictor = spectral_start;
    let point_transform = ah_al & 0x0F;
    let _ = spectral_end;

    // Imebra's `m_defaultDCValue`: a lossless scan's predictor seeds at the
    // half-range default (spec table P0); every other profile's DC
    // prediction starts at 0 (T.81 §F.2.2.1).
    let initial_dc_value = if frame.is_lossless() { 1 << (frame.precision - 1) } else { 0 };
    for &idx in &scan_components {
        frame.components[idx].last_dc_value = initial_dc_value;
    }

    if frame.is_lossless() {
        decode_lossless_scan(view, frame, image, &scan_components, predictor, point_transform)
    } else {
        decode_lossy_scan(view, frame, image, &scan_components)
    }
}

fn decompression_table_for(frame: &mut FrameHeader, index: usize) -> Result<[i32; 64]> {
    if let Some(cached) = frame.quant_tables_decompression[index] {
        return Ok(cached);
    }
    let raw = frame.quant_tables[index]
        .ok_or_else(|| error::Error::CorruptedFile { reason: "scan references undefined quantization table".to_string() })?;
    let table = quant::build_decompression_table(&raw);
    frame.quant_tables_decompression[index] = Some(table);
    Ok(table)
}

fn decode_lossy_scan(
    view: &mut StreamView,
    frame: &mut FrameHeader,
    image: &mut JpegImage,
    scan_components: &[usize],
) -> Result<()> {
    let (h_max, v_max) = frame.max_sampling();
    let mcus_x = frame.mcus_per_row();
    let mcus_y = frame.mcus_per_column();
    let restart_interval = frame.restart_interval as u32;
    let mut mcu_index: u32 = 0;
    let half: i32 = 1 << (frame.precision - 1);
    let max_val: i32 = (1 << frame.precision) - 1;

    // One BitReader spans an entire restart segment: JPEG entropy bits pack
    // continuously across block and MCU boundaries, only realigning to a
    // byte boundary at a restart marker.
    let mut reader = BitReader::new(view);

    for mcu_row in 0..mcus_y {
        for mcu_col in 0..mcus_x {
            if restart_interval != 0 && mcu_index != 0 && mcu_index % restart_interval == 0 {
                drop(reader);
                consume_restart_marker(view)?;
                for &idx in scan_components {
                    frame.components[idx].last_dc_value = 0;
                }
                reader = BitReader::new(view);
            }

            for &comp_idx in scan_components {
                let (h_s, v_s, quant_idx, dc_idx, ac_idx) = {
                    let c = &frame.components[comp_idx];
                    (c.h_sampling, c.v_sampling, c.quant_table_index as usize, c.dc_table_index as usize, c.ac_table_index as usize)
                };
                let quant_table = decompression_table_for(frame, quant_idx)?;

                for by in 0..v_s {
                    for bx in 0..h_s {
                        let dc_table = frame.dc_tables[dc_idx]
                            .clone()
                            .ok_or_else(|| error::Error::CorruptedFile { reason: "scan references undefined DC table".to_string() })?;
                        let ac_table = frame.ac_tables[ac_idx]
                            .clone()
                            .ok_or_else(|| error::Error::CorruptedFile { reason: "scan references undefined AC table".to_string() })?;

                        let block = lossy::decode_block(
                            &mut reader,
                            &dc_table,
                            &ac_table,
                            &quant_table,
                            &mut frame.components[comp_idx],
                        )?;

                        let origin_row = mcu_row as usize * 8 * v_max as usize / v_s as usize + by as usize * 8;
                        let origin_col = mcu_col as usize * 8 * h_max as usize / h_s as usize + bx as usize * 8;

                        for r in 0..8 {
                            for c in 0..8 {
                                let src = block[r * 8 + c] + half;
                                let clamped = src.clamp(0, max_val);
                                place_sample(image, frame, comp_idx, origin_row + r, origin_col + c, h_max, v_max, h_s, v_s, clamped);
                            }
                        }
                    }
                }
            }
            mcu_index += 1;
        }
    }
    Ok(())
}

/// Writes one decoded 8x8 block's sample into every output pixel position
/// its subsampling footprint covers (nearest-neighbor upsampling for any
/// channel with a smaller sampling factor than the frame's max).
#[allow(clippy::too_many_arguments)]
fn place_sample(
    image: &mut JpegImage,
    frame: &FrameHeader,
    comp_idx: usize,
    row: usize,
    col: usize,
    h_max: u8,
    v_max: u8,
    h_s: u8,
    v_s: u8,
    value: i32,
) {
    let rep_h = (h_max / h_s.max(1)) as usize;
    let rep_v = (v_max / v_s.max(1)) as usize;
    for dv in 0..rep_v {
        for dh in 0..rep_h {
            let out_row = row * rep_v + dv;
            let out_col = col * rep_h + dh;
            if out_row < frame.height as usize && out_col < frame.width as usize {
                *image.sample_mut(comp_idx, out_row, out_col) = value;
            }
        }
    }
}

fn consume_restart_marker(view: &mut StreamView) -> Result<()> {
    let m = next_marker(view)?;
    if !marker::is_rst(m) {
        return error::CorruptedFileSnafu { reason: format!("expected restart marker, got 0x{m:02X}") }.fail();
    }
    Ok(())
}

fn decode_lossless_scan(
    view: &mut StreamView,
    frame: &mut FrameHeader,
    image: &mut JpegImage,
    scan_components: &[usize],
    predictor: u8,
    _point_transform: u8,
) -> Result<()> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let half: i32 = 1 << (frame.precision - 1);
    let restart_interval = frame.restart_interval as u32;

    // Single-channel or fully-sampled (non-subsampled) lossless planes
    // only; DICOM's lossless transfer syntaxes are always 4:4:4.
    let n = scan_components.len();
    let mut planes: Vec<Vec<i32>> = vec![vec![0i32; width * height]; n];

    for &comp_idx in scan_components {
        frame.components[comp_idx].ac_table_index = predictor;
    }

    let mut sample_count: u32 = 0;
    let mut just_restarted = false;
    let mut reader = BitReader::new(view);
    'rows: for row in 0..height {
        for col in 0..width {
            if restart_interval != 0 && sample_count != 0 && sample_count % restart_interval == 0 {
                drop(reader);
                consume_restart_marker(view)?;
                for &idx in scan_components {
                    frame.components[idx].last_dc_value = half;
                }
                reader = BitReader::new(view);
                just_restarted = true;
            }
            for (local, &comp_idx) in scan_components.iter().enumerate() {
                let dc_idx = frame.components[comp_idx].dc_table_index as usize;
                let dc_table = frame.dc_tables[dc_idx]
                    .clone()
                    .ok_or_else(|| error::Error::CorruptedFile { reason: "lossless scan references undefined DC table".to_string() })?;

                let value = lossless::decode_sample(
                    &mut reader,
                    &dc_table,
                    &mut frame.components[comp_idx],
                    &planes[local],
                    width,
                    row,
                    col,
                    half,
                    just_restarted,
                )?;
                planes[local][row * width + col] = value;
            }
            just_restarted = false;
            sample_count += 1;
            if sample_count as usize >= width * height {
                break 'rows;
            }
        }
    }

    for (local, &comp_idx) in scan_components.iter().enumerate() {
        for row in 0..height {
            for col in 0..width {
                *image.sample_mut(comp_idx, row, col) = planes[local][row * width + col];
            }
        }
    }
    Ok(())
}

/// Encodes a single-scan baseline (or extended, if `extended` is set)
/// lossy JPEG at the given quality preset. Always emits 4:4:4 sampling
/// (every component sampled 1x1), matching how DICOM pixel data is
/// virtually always stored.
pub fn encode_lossy(image: &JpegImage, quality: QualityPreset, extended: bool) -> Result<Vec<u8>> {
    encode_lossy_with_quality(image, quality.percent(), extended)
}

/// As [`encode_lossy`], but takes a raw IJG 1-100 quality percentage
/// instead of a [`QualityPreset`] — the entry point callers with their own
/// quality scale (e.g. `pixeldata::image::Quality`) should use, so they
/// don't have to round-trip through this crate's preset percentages.
pub fn encode_lossy_with_quality(image: &JpegImage, quality_percent: u32, extended: bool) -> Result<Vec<u8>> {
    if image.precision > 8 && !extended {
        return error::JpegUnsupportedSnafu { what: "baseline profile requires 8-bit precision" }.fail();
    }
    let mut out = Vec::new();
    out.extend_from_slice(&[0xFF, marker::SOI]);

    let luma_q = quant::scale_table_for_quality(&quant::STD_LUMINANCE, quality_percent);
    let chroma_q = quant::scale_table_for_quality(&quant::STD_CHROMINANCE, quality_percent);
    write_dqt(&mut out, 0, &luma_q);
    if image.samples_per_pixel > 1 {
        write_dqt(&mut out, 1, &chroma_q);
    }

    let comp_count = image.samples_per_pixel as usize;
    let half = 1i32 << (image.precision - 1);

    let (dc_freq, ac_freq) = collect_lossy_frequencies(image, &luma_q, &chroma_q, comp_count, half);
    let (dc_luma, dc_luma_bits, dc_luma_vals) = HuffmanTable::from_frequencies(&dc_freq[0], 16);
    let (ac_luma, ac_luma_bits, ac_luma_vals) = HuffmanTable::from_frequencies(&ac_freq[0], 16);
    write_dht(&mut out, false, 0, &dc_luma_bits, &dc_luma_vals);
    write_dht(&mut out, true, 0, &ac_luma_bits, &ac_luma_vals);

    let (dc_chroma, dc_chroma_bits, dc_chroma_vals, ac_chroma, ac_chroma_bits, ac_chroma_vals) = if comp_count > 1 {
        let (dct, dctb, dctv) = HuffmanTable::from_frequencies(&dc_freq[1], 16);
        let (act, actb, actv) = HuffmanTable::from_frequencies(&ac_freq[1], 16);
        write_dht(&mut out, false, 1, &dctb, &dctv);
        write_dht(&mut out, true, 1, &actb, &actv);
        (Some(dct), dctb, dctv, Some(act), actb, actv)
    } else {
        (None, [0u8; 16], Vec::new(), None, [0u8; 16], Vec::new())
    };
    let _ = (dc_chroma_bits, dc_chroma_vals, ac_chroma_bits, ac_chroma_vals);

    let sof_marker = if extended { marker::SOF1 } else { marker::SOF0 };
    write_sof(&mut out, sof_marker, image.precision, image.width, image.height, comp_count);
    write_sos_header(&mut out, comp_count);

    let quant_comp_luma = quant::build_compression_table(&luma_q);
    let quant_comp_chroma = quant::build_compression_table(&chroma_q);

    let mut writer = BitWriter::new();
    let mut components: Vec<Component> = (0..comp_count)
        .map(|i| Component {
            id: (i + 1) as u8,
            h_sampling: 1,
            v_sampling: 1,
            quant_table_index: if i == 0 { 0 } else { 1 },
            dc_table_index: if i == 0 { 0 } else { 1 },
            ac_table_index: if i == 0 { 0 } else { 1 },
            // Lossy DC prediction starts at 0 (T.81 §F.2.2.1), matching the
            // decoder's own initial value.
            last_dc_value: 0,
        })
        .collect();

    let blocks_x = (image.width as usize + 7) / 8;
    let blocks_y = (image.height as usize + 7) / 8;
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            for (c, comp) in components.iter_mut().enumerate() {
                let block = extract_block(image, c, bx * 8, by * 8, half);
                let (dc_table, ac_table, quant_table) = if c == 0 {
                    (&dc_luma, &ac_luma, &quant_comp_luma)
                } else {
                    (dc_chroma.as_ref().unwrap(), ac_chroma.as_ref().unwrap(), &quant_comp_chroma)
                };
                lossy::encode_block(&mut writer, &block, dc_table, ac_table, quant_table, comp);
            }
        }
    }
    out.extend_from_slice(&writer.into_bytes());
    out.extend_from_slice(&[0xFF, marker::EOI]);
    Ok(out)
}

/// Encodes a single-scan lossless JPEG using `predictor` (1-7).
pub fn encode_lossless(image: &JpegImage, predictor: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(&[0xFF, marker::SOI]);

    let comp_count = image.samples_per_pixel as usize;
    let half = 1i32 << (image.precision - 1);

    let mut freq = vec![vec![0u64; 17]; comp_count];
    for c in 0..comp_count {
        for row in 0..image.height as usize {
            for col in 0..image.width as usize {
                let value = image.sample(c, row, col);
                let prediction = lossless_prediction(image, c, row, col, predictor, half);
                let diff = value - prediction;
                let (size, _) = lossy::amplitude_code(diff);
                freq[c][size as usize] += 1;
            }
        }
    }

    let mut tables = Vec::with_capacity(comp_count);
    for (idx, f) in freq.iter().enumerate() {
        let (table, bits, values) = HuffmanTable::from_frequencies(f, 16);
        write_dht(&mut out, false, idx as u8, &bits, &values);
        tables.push(table);
    }

    write_sof(&mut out, marker::SOF3, image.precision, image.width, image.height, comp_count);
    write_sos_lossless_header(&mut out, comp_count, predictor);

    let mut writer = BitWriter::new();
    for row in 0..image.height as usize {
        for col in 0..image.width as usize {
            for c in 0..comp_count {
                let value = image.sample(c, row, col);
                let prediction = lossless_prediction(image, c, row, col, predictor, half);
                lossless::encode_sample(&mut writer, &tables[c], value, prediction, half);
            }
        }
    }
    out.extend_from_slice(&writer.into_bytes());
    out.extend_from_slice(&[0xFF, marker::EOI]);
    Ok(out)
}

fn lossless_prediction(image: &JpegImage, c: usize, row: usize, col: usize, predictor: u8, half: i32) -> i32 {
    if row == 0 && col == 0 {
        return half;
    }
    if row == 0 {
        return image.sample(c, row, col - 1);
    }
    if col == 0 {
        return image.sample(c, row - 1, col);
    }
    let a = image.sample(c, row, col - 1);
    let b = image.sample(c, row - 1, col);
    let cc = image.sample(c, row - 1, col - 1);
    lossless::predict(predictor, a, b, cc)
}

fn extract_block(image: &JpegImage, channel: usize, x0: usize, y0: usize, half: i32) -> [i32; 64] {
    let mut block = [0i32; 64];
    for r in 0..8 {
        for c in 0..8 {
            let row = (y0 + r).min(image.height as usize - 1);
            let col = (x0 + c).min(image.width as usize - 1);
            block[r * 8 + c] = image.sample(channel, row, col) - half;
        }
    }
    block
}

fn collect_lossy_frequencies(
    image: &JpegImage,
    luma_q: &[u16; 64],
    chroma_q: &[u16; 64],
    comp_count: usize,
    half: i32,
) -> (Vec<[u64; 16]>, Vec<[u64; 256]>) {
    let mut dc_freq = vec![[0u64; 16]; comp_count.min(2).max(1)];
    let mut ac_freq = vec![[0u64; 256]; comp_count.min(2).max(1)];
    let quant_luma = quant::build_compression_table(luma_q);
    let quant_chroma = quant::build_compression_table(chroma_q);

    let blocks_x = (image.width as usize + 7) / 8;
    let blocks_y = (image.height as usize + 7) / 8;
    // Frequency collection must mirror `encode_lossy_with_quality`'s own
    // per-component DC predictor start (0), not the half-range level shift
    // `half` otherwise denotes here.
    let mut last_dc = vec![0i32; comp_count];

    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            for c in 0..comp_count {
                let mut block = extract_block(image, c, bx * 8, by * 8, half);
                dct::fdct_8x8(&mut block);
                let table = if c == 0 { &quant_luma } else { &quant_chroma };
                let mut natural = [0i32; 64];
                for i in 0..64 {
                    natural[i] = (block[i] as i64 * table[i] as i64 >> 14) as i32;
                }
                let coeffs = quant::zigzag(&natural);

                let bucket = if c == 0 { 0 } else { 1 };
                let diff = coeffs[0] - last_dc[c];
                last_dc[c] = coeffs[0];
                let (size, _) = lossy::amplitude_code(diff);
                dc_freq[bucket][size as usize] += 1;

                let mut run = 0u8;
                for k in 1..64 {
                    if coeffs[k] == 0 {
                        run += 1;
                        continue;
                    }
                    while run >= 16 {
                        ac_freq[bucket][0xF0] += 1;
                        run -= 16;
                    }
                    let (size, _) = lossy::amplitude_code(coeffs[k]);
                    ac_freq[bucket][((run << 4) | size) as usize] += 1;
                    run = 0;
                }
                if run > 0 {
                    ac_freq[bucket][0x00] += 1;
                }
            }
        }
    }
    (dc_freq, ac_freq)
}

fn write_dqt(out: &mut Vec<u8>, index: u8, table_natural: &[u16; 64]) {
    out.extend_from_slice(&[0xFF, marker::DQT]);
    out.extend_from_slice(&(67u16).to_be_bytes());
    out.push(index);
    let zz = quant::zigzag(&table_natural.map(|v| v as i32));
    for v in zz {
        out.push(v as u8);
    }
}

fn write_dht(out: &mut Vec<u8>, is_ac: bool, index: u8, bits: &[u8; 16], values: &[u8]) {
    out.extend_from_slice(&[0xFF, marker::DHT]);
    let len = 2 + 1 + 16 + values.len();
    out.extend_from_slice(&(len as u16).to_be_bytes());
    out.push(((is_ac as u8) << 4) | index);
    out.extend_from_slice(bits);
    out.extend_from_slice(values);
}

fn write_sof(out: &mut Vec<u8>, marker_byte: u8, precision: u8, width: u16, height: u16, comp_count: usize) {
    out.extend_from_slice(&[0xFF, marker_byte]);
    let len = 8 + 3 * comp_count;
    out.extend_from_slice(&(len as u16).to_be_bytes());
    out.push(precision);
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&width.to_be_bytes());
    out.push(comp_count as u8);
    for i in 0..comp_count {
        out.push((i + 1) as u8);
        out.push(0x11);
        out.push(if i == 0 { 0 } else { 1 });
    }
}

fn write_sos_header(out: &mut Vec<u8>, comp_count: usize) {
    out.extend_from_slice(&[0xFF, marker::SOS]);
    let len = 6 + 2 * comp_count;
    out.extend_from_slice(&(len as u16).to_be_bytes());
    out.push(comp_count as u8);
    for i in 0..comp_count {
        out.push((i + 1) as u8);
        let t = if i == 0 { 0x00 } else { 0x11 };
        out.push(t);
    }
    out.push(0);
    out.push(63);
    out.push(0);
}

fn write_sos_lossless_header(out: &mut Vec<u8>, comp_count: usize, predictor: u8) {
    out.extend_from_slice(&[0xFF, marker::SOS]);
    let len = 6 + 2 * comp_count;
    out.extend_from_slice(&(len as u16).to_be_bytes());
    out.push(comp_count as u8);
    for i in 0..comp_count {
        out.push((i + 1) as u8);
        out.push((i as u8) << 4);
    }
    out.push(predictor);
    out.push(0);
    out.push(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_image(width: u16, height: u16, value: i32) -> JpegImage {
        JpegImage {
            width,
            height,
            precision: 8,
            samples_per_pixel: 1,
            samples: vec![value; width as usize * height as usize],
        }
    }

    #[test]
    fn encodes_flat_lossless_image_without_panicking() {
        let image = flat_image(16, 16, 128);
        let encoded = encode_lossless(&image, 1).expect("encode succeeds");
        assert_eq!(&encoded[0..2], &[0xFF, marker::SOI]);
        assert_eq!(&encoded[encoded.len() - 2..], &[0xFF, marker::EOI]);
    }

    #[test]
    fn lossless_round_trip_recovers_flat_image() {
        let image = flat_image(8, 8, 100);
        let encoded = encode_lossless(&image, 1).expect("encode succeeds");
        let decoded = decode(&encoded).expect("decode succeeds");
        assert_eq!(decoded.width, 8);
        assert_eq!(decoded.height, 8);
        assert!(decoded.samples.iter().all(|&v| v == 100));
    }

    #[test]
    fn encodes_flat_lossy_image_without_panicking() {
        let image = flat_image(16, 16, 128);
        let encoded = encode_lossy(&image, QualityPreset::High, false).expect("encode succeeds");
        assert_eq!(&encoded[0..2], &[0xFF, marker::SOI]);
    }
}
