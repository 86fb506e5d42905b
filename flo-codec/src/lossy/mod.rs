// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `lossy` module implements the perceptual transform coder.
//!
//! A channel is coded as a stream of lapped MDCT blocks: long 2048-sample windows for
//! stationary audio, runs of short 256-sample windows bracketed by start/stop transitions
//! around transients. Each block's spectrum is quantized against per-band masking thresholds
//! and stored sparsely.
//!
//! Frame boundaries are packetization only. The decoder keeps per-channel overlap state and a
//! queue of finalized samples across frames, and a stream always opens with a long-family
//! block whose first half reconstructs encoder priming; those samples are discarded.

pub mod psy;
pub mod rle;
pub mod window;

use std::collections::VecDeque;

use log::trace;

use flo_core::dsp::mdct::{Imdct, Mdct};
use flo_core::errors::{transform_error, Error, Result};
use flo_core::io::{ByteReader, ByteWriter};

use flo_format::frame::BlockKind;

use psy::{compute_scale_factors, sf_decode, BandMaps, NUM_BANDS};
use window::{advance, finalize_offset, Windows, LONG_SIZE, PRIMING_SAMPLES, SHORT_RUN, SHORT_SIZE};

/// Energy step between adjacent 256-sample sub-blocks that flags a transient.
const TRANSIENT_RATIO: f64 = 3.0;
/// Energy floor below which a rise is not a transient.
const TRANSIENT_FLOOR: f64 = 1.0e-3;

/// One parsed transform block record.
pub struct Block {
    pub kind: BlockKind,
    pub sfs: [u16; NUM_BANDS],
    pub coeffs: Vec<i16>,
}

/// Serializes a block record: kind tag, scale factors, then the length-prefixed sparse
/// coefficient stream.
pub fn write_block(writer: &mut ByteWriter, kind: BlockKind, sfs: &[u16; NUM_BANDS], rle: &[u8]) {
    writer.write_u8(kind.tag());
    for &sf in sfs {
        writer.write_u16(sf);
    }
    writer.write_u32(rle.len() as u32);
    writer.write_buf_bytes(rle);
}

/// Parses one block record.
pub fn read_block(reader: &mut ByteReader<'_>) -> Result<Block> {
    let kind = BlockKind::from_tag(reader.read_u8()?)?;

    let mut sfs = [0u16; NUM_BANDS];
    for sf in sfs.iter_mut() {
        *sf = reader.read_u16()?;
    }

    let coeff_length = reader.read_u32()? as usize;
    let rle = reader
        .read_buf_bytes_ref(coeff_length)
        .map_err(|_| Error::TruncatedBitstream("coefficient stream"))?;

    let mut coeffs = Vec::new();
    rle::decode_coeffs(rle, kind.coeff_count(), &mut coeffs)?;

    Ok(Block { kind, sfs, coeffs })
}

/// One encoded block together with the decoder's cumulative output after it.
pub struct EncodedBlock {
    pub bytes: Vec<u8>,
    /// How many post-priming samples the decoder will have finalized once this block is
    /// processed. The frame packetizer cuts on this.
    pub emitted_after: usize,
}

/// The per-channel synthesis state: overlap accumulator and finalized-sample queue.
pub struct ChannelState {
    /// Overlap-add accumulator; `pending[0]` sits at absolute position `pending_pos`.
    pending: Vec<f32>,
    pending_pos: i64,
    /// Absolute start of the most recent block.
    block_pos: i64,
    prev: Option<BlockKind>,
    fifo: VecDeque<f32>,
}

impl ChannelState {
    pub fn new() -> ChannelState {
        ChannelState {
            pending: Vec::new(),
            pending_pos: -(PRIMING_SAMPLES as i64),
            block_pos: 0,
            prev: None,
            fifo: VecDeque::new(),
        }
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.pending_pos = -(PRIMING_SAMPLES as i64);
        self.block_pos = 0;
        self.prev = None;
        self.fifo.clear();
    }

    /// The number of finalized samples waiting to be emitted.
    pub fn available(&self) -> usize {
        self.fifo.len()
    }

    /// Pops one finalized sample.
    pub fn pop(&mut self) -> Option<f32> {
        self.fifo.pop_front()
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        ChannelState::new()
    }
}

/// The transform codec: shared windows, transforms, and band tables for one sample rate.
pub struct TransformCodec {
    windows: Windows,
    mdct_long: Mdct,
    mdct_short: Mdct,
    imdct_long: Imdct,
    imdct_short: Imdct,
    bands: BandMaps,
}

impl TransformCodec {
    pub fn new(sample_rate: u32) -> TransformCodec {
        TransformCodec {
            windows: Windows::new(),
            mdct_long: Mdct::new(LONG_SIZE / 2),
            mdct_short: Mdct::new(SHORT_SIZE / 2),
            imdct_long: Imdct::new(LONG_SIZE / 2),
            imdct_short: Imdct::new(SHORT_SIZE / 2),
            bands: BandMaps::new(sample_rate),
        }
    }

    /// Detects a transient within the 2048-sample span starting at `pos`.
    fn is_transient(&self, signal: &[f32], pos: i64) -> bool {
        let mut energies = [0.0f64; LONG_SIZE / SHORT_SIZE];

        for (i, energy) in energies.iter_mut().enumerate() {
            for j in 0..SHORT_SIZE {
                let idx = pos + (i * SHORT_SIZE + j) as i64;
                if idx >= 0 && (idx as usize) < signal.len() {
                    let s = f64::from(signal[idx as usize]);
                    *energy += s * s;
                }
            }
        }

        energies
            .windows(2)
            .any(|w| w[1] > TRANSIENT_RATIO * w[0] + TRANSIENT_FLOOR)
    }

    /// Encodes one channel into its complete block stream.
    ///
    /// The stream covers the whole signal: the encoder keeps emitting blocks (padding the
    /// input with zeros) until the decoder-side output reaches the signal length, flushing
    /// through a synthetic stop block when a transient run is still open.
    pub fn encode_channel(&self, signal: &[f32], quality: f32) -> Vec<EncodedBlock> {
        let total = signal.len();

        let mut blocks: Vec<EncodedBlock> = Vec::new();
        let mut prev: Option<BlockKind> = None;
        let mut pos = -(PRIMING_SAMPLES as i64);
        let mut shorts_left = 0usize;
        let mut emitted = 0usize;

        let mut input = vec![0.0f32; LONG_SIZE];
        let mut spectrum = vec![0.0f32; LONG_SIZE / 2];
        let mut quantized = vec![0i16; LONG_SIZE / 2];

        while emitted < total || blocks.is_empty() {
            let kind = match prev {
                None => {
                    if self.is_transient(signal, pos) {
                        BlockKind::Start
                    }
                    else {
                        BlockKind::Long
                    }
                }
                Some(BlockKind::Long) | Some(BlockKind::Stop) => {
                    let next = pos + advance(prev.unwrap(), BlockKind::Long);
                    // Flushing past the end of the signal never needs another transient run.
                    if (next as usize) < total && self.is_transient(signal, next) {
                        BlockKind::Start
                    }
                    else {
                        BlockKind::Long
                    }
                }
                Some(BlockKind::Start) => {
                    shorts_left = SHORT_RUN - 1;
                    BlockKind::Short
                }
                Some(BlockKind::Short) => {
                    if shorts_left > 0 {
                        shorts_left -= 1;
                        BlockKind::Short
                    }
                    else {
                        BlockKind::Stop
                    }
                }
            };

            if let Some(prev) = prev {
                pos += advance(prev, kind);
            }

            let size = kind.block_size();
            let n = size / 2;
            let window = self.windows.window(kind);

            for (j, slot) in input[..size].iter_mut().enumerate() {
                let idx = pos + j as i64;
                let sample = if idx >= 0 && (idx as usize) < total {
                    signal[idx as usize]
                }
                else {
                    0.0
                };
                *slot = sample * window[j];
            }

            let mdct = match kind {
                BlockKind::Short => &self.mdct_short,
                _ => &self.mdct_long,
            };
            mdct.mdct(&input[..size], &mut spectrum[..n]);

            let band_map = self.bands.for_kind(kind);
            let sfs = compute_scale_factors(&spectrum[..n], band_map, quality);

            for b in 0..NUM_BANDS {
                let step = sf_decode(sfs[b]);
                for k in band_map.band_range(b) {
                    if k >= n {
                        break;
                    }
                    let value = (spectrum[k] / step).round();
                    quantized[k] = value.clamp(-32768.0, 32767.0) as i16;
                }
            }

            let rle = rle::encode_coeffs(&quantized[..n]);

            let mut writer = ByteWriter::new();
            write_block(&mut writer, kind, &sfs, &rle);

            emitted = (pos + finalize_offset(kind) as i64).max(0) as usize;

            blocks.push(EncodedBlock { bytes: writer.into_bytes(), emitted_after: emitted });
            prev = Some(kind);
        }

        trace!("transform channel: {} blocks for {} samples", blocks.len(), total);

        blocks
    }

    /// Synthesizes one block into the channel state: dequantize, inverse transform, window,
    /// overlap-add, and finalize everything the next block can no longer touch.
    pub fn decode_block(&self, state: &mut ChannelState, block: &Block) -> Result<()> {
        let kind = block.kind;

        let start = match state.prev {
            None => {
                if !matches!(kind, BlockKind::Long | BlockKind::Start) {
                    return transform_error("stream must open with a long-family block");
                }
                -(PRIMING_SAMPLES as i64)
            }
            Some(prev) => {
                if !prev.may_precede(kind) {
                    return transform_error("illegal block sequence");
                }
                state.block_pos + advance(prev, kind)
            }
        };

        let size = kind.block_size();
        let n = size / 2;

        let band_map = self.bands.for_kind(kind);
        let mut spectrum = vec![0.0f32; n];
        for b in 0..NUM_BANDS {
            let step = sf_decode(block.sfs[b]);
            for k in band_map.band_range(b) {
                if k >= n {
                    break;
                }
                spectrum[k] = f32::from(block.coeffs[k]) * step;
            }
        }

        let imdct = match kind {
            BlockKind::Short => &self.imdct_short,
            _ => &self.imdct_long,
        };
        let mut time = vec![0.0f32; size];
        imdct.imdct(&spectrum, &mut time);

        let window = self.windows.window(kind);
        for (t, &w) in time.iter_mut().zip(window) {
            *t *= w;
        }

        if state.prev.is_none() {
            state.pending_pos = start;
        }

        // Grow the accumulator to cover this block, then overlap-add. Positions before the
        // accumulator start only occur under a stop block's leading zero region.
        let need = (start + size as i64 - state.pending_pos) as usize;
        if state.pending.len() < need {
            state.pending.resize(need, 0.0);
        }

        for (j, &t) in time.iter().enumerate() {
            let abs = start + j as i64;
            if abs >= state.pending_pos {
                state.pending[(abs - state.pending_pos) as usize] += t;
            }
        }

        // Everything before the finalize point is complete. Priming samples (absolute
        // position < 0) reconstruct the encoder's zero padding and are dropped.
        let fin = start + finalize_offset(kind) as i64;
        let drain = (fin - state.pending_pos).max(0) as usize;

        for (i, &sample) in state.pending[..drain].iter().enumerate() {
            if state.pending_pos + i as i64 >= 0 {
                state.fifo.push_back(sample.clamp(-1.0, 1.0));
            }
        }

        state.pending.drain(..drain);
        state.pending_pos = state.pending_pos.max(fin);
        state.block_pos = start;
        state.prev = Some(kind);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_stream(
        codec: &TransformCodec,
        blocks: &[EncodedBlock],
        total: usize,
    ) -> Vec<f32> {
        let mut state = ChannelState::new();

        for block in blocks {
            let mut reader = ByteReader::new(&block.bytes);
            let block = read_block(&mut reader).unwrap();
            codec.decode_block(&mut state, &block).unwrap();
        }

        assert!(state.available() >= total);
        (0..total).map(|_| state.pop().unwrap()).collect()
    }

    fn psnr(reference: &[f32], decoded: &[f32]) -> f64 {
        let mse = reference
            .iter()
            .zip(decoded)
            .map(|(&a, &b)| (f64::from(a) - f64::from(b)).powi(2))
            .sum::<f64>()
            / reference.len() as f64;
        10.0 * (1.0 / mse.max(1.0e-30)).log10()
    }

    #[test]
    fn verify_sine_channel_round_trip() {
        let codec = TransformCodec::new(44100);

        let signal: Vec<f32> = (0..44100)
            .map(|i| {
                0.8 * (2.0 * std::f64::consts::PI * 440.0 * i as f64 / 44100.0).sin() as f32
            })
            .collect();

        let blocks = codec.encode_channel(&signal, 0.95);
        let decoded = decode_stream(&codec, &blocks, signal.len());

        assert!(psnr(&signal, &decoded) > 60.0);
    }

    #[test]
    fn verify_transient_produces_short_run() {
        let codec = TransformCodec::new(44100);

        // Silence, then a sharp attack.
        let mut signal = vec![0.0f32; 8000];
        for (i, s) in signal.iter_mut().enumerate().skip(4000) {
            *s = 0.7 * (2.0 * std::f64::consts::PI * 1000.0 * (i - 4000) as f64 / 44100.0).sin()
                as f32;
        }

        let blocks = codec.encode_channel(&signal, 0.55);

        let kinds: Vec<BlockKind> = blocks
            .iter()
            .map(|b| read_block(&mut ByteReader::new(&b.bytes)).unwrap().kind)
            .collect();

        assert!(kinds.contains(&BlockKind::Start));
        assert!(kinds.contains(&BlockKind::Short));
        assert!(kinds.contains(&BlockKind::Stop));

        // And the sequence must still be legal end to end.
        for pair in kinds.windows(2) {
            assert!(pair[0].may_precede(pair[1]), "illegal {:?} -> {:?}", pair[0], pair[1]);
        }

        let decoded = decode_stream(&codec, &blocks, signal.len());
        assert!(psnr(&signal, &decoded) > 20.0);
    }

    #[test]
    fn verify_quality_ordering() {
        let codec = TransformCodec::new(44100);

        let signal: Vec<f32> = (0..22050)
            .map(|i| {
                let t = i as f64 / 44100.0;
                (0.4 * (2.0 * std::f64::consts::PI * 440.0 * t).sin()
                    + 0.3 * (2.0 * std::f64::consts::PI * 3200.0 * t).sin()
                    + 0.1 * ((i * 2_654_435_761u64 as i64 as usize) % 1000) as f64 / 1000.0)
                    as f32
            })
            .collect();

        let sizes: Vec<usize> = [0.10f32, 0.30, 0.55, 0.75, 0.95]
            .iter()
            .map(|&q| {
                codec.encode_channel(&signal, q).iter().map(|b| b.bytes.len()).sum()
            })
            .collect();

        for pair in sizes.windows(2) {
            assert!(pair[0] < pair[1], "sizes not monotone: {:?}", sizes);
        }
    }

    #[test]
    fn verify_rejects_short_first_block() {
        let codec = TransformCodec::new(44100);
        let mut state = ChannelState::new();

        let block = Block {
            kind: BlockKind::Short,
            sfs: [32768; NUM_BANDS],
            coeffs: vec![0; 128],
        };

        assert!(codec.decode_block(&mut state, &block).is_err());
    }
}
