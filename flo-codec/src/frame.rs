// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `frame` module provides the one-second frame codec.
//!
//! Encoding analyzes a frame and settles on one of the frame-type variants: silence, ALPC at
//! the winning predictor order, a transform block sequence, or raw PCM when prediction loses
//! to the uncompressed fallback. Decoding dispatches on the frame-type tag and reconstructs
//! interleaved floating-point PCM.

use log::trace;

use flo_core::errors::{bitstream_error, Error, Result};
use flo_core::io::{ByteReader, ByteWriter};
use flo_core::sample::{dequantize, quantize};

use flo_format::frame::{FrameHeader, FrameType};

use crate::lossless;
use crate::lossless::residual::{decode_residuals, encode_residuals, ResidualCode};
use crate::lossy::{read_block, ChannelState, TransformCodec};

/// Peak absolute sample value below which a frame is digital silence.
const SILENCE_THRESHOLD: f32 = 9.313_225_7e-10; // 2^-30

/// Encodes one lossless frame: frame header plus size-prefixed channel payloads.
///
/// `channels` holds the deinterleaved samples of this frame, one slice per channel, all of
/// equal length.
pub fn encode_lossless_frame(channels: &[&[f32]], bit_depth: u32, level: u8) -> Vec<u8> {
    let frame_samples = channels[0].len() as u32;

    let silent = channels
        .iter()
        .all(|ch| ch.iter().all(|&s| s.abs() < SILENCE_THRESHOLD));

    if silent {
        let header =
            FrameHeader { frame_type: FrameType::Silence, frame_samples, flags: 0 };

        let mut writer = ByteWriter::new();
        header.write(&mut writer);
        for _ in channels {
            writer.write_u32(0);
        }
        return writer.into_bytes();
    }

    let quantized: Vec<Vec<i32>> = channels
        .iter()
        .map(|ch| ch.iter().map(|&s| quantize(s, bit_depth)).collect())
        .collect();

    let max_order = lossless::search_order(level);

    let encoded: Vec<lossless::EncodedChannel> =
        quantized.iter().map(|ch| lossless::encode_channel(ch, bit_depth, max_order)).collect();

    // The uncompressed fallback costs a fixed number of bytes per channel; prediction has to
    // beat it over the whole frame or the frame is stored raw.
    let alpc_size: usize = encoded.iter().map(|ch| ch.payload.len()).sum();
    let raw_size = channels.len() * ((frame_samples as usize * bit_depth as usize + 7) / 8);

    let mut writer = ByteWriter::new();

    if raw_size < alpc_size {
        trace!("frame falls back to raw pcm: {} < {} bytes", raw_size, alpc_size);

        let header = FrameHeader { frame_type: FrameType::Raw, frame_samples, flags: 0 };
        header.write(&mut writer);

        for ch in &quantized {
            let payload = encode_residuals(ch, ResidualCode::Raw, bit_depth);
            writer.write_u32(payload.len() as u32);
            writer.write_buf_bytes(&payload);
        }
    }
    else {
        let order = encoded.iter().map(|ch| ch.order).max().unwrap_or(1);

        let header =
            FrameHeader { frame_type: FrameType::Alpc(order), frame_samples, flags: 0 };
        header.write(&mut writer);

        for ch in &encoded {
            writer.write_u32(ch.payload.len() as u32);
            writer.write_buf_bytes(&ch.payload);
        }
    }

    writer.into_bytes()
}

/// Assembles one transform frame from per-channel concatenated block records.
pub fn assemble_transform_frame(frame_samples: u32, channel_payloads: &[Vec<u8>]) -> Vec<u8> {
    let header = FrameHeader { frame_type: FrameType::Transform, frame_samples, flags: 0 };

    let mut writer = ByteWriter::new();
    header.write(&mut writer);
    for payload in channel_payloads {
        writer.write_u32(payload.len() as u32);
        writer.write_buf_bytes(payload);
    }
    writer.into_bytes()
}

/// Decodes frame records sequentially, holding the lossy synthesis state that persists
/// across frames.
pub struct FrameDecoder {
    sample_rate: u32,
    channels: usize,
    bit_depth: u32,
    transform: Option<TransformCodec>,
    states: Vec<ChannelState>,
    // Scratch reused across frames.
    ints: Vec<i32>,
}

impl FrameDecoder {
    pub fn new(sample_rate: u32, channels: usize, bit_depth: u32) -> FrameDecoder {
        FrameDecoder {
            sample_rate,
            channels,
            bit_depth,
            transform: None,
            states: (0..channels).map(|_| ChannelState::new()).collect(),
            ints: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
    }

    /// Decodes the next frame record from `reader` and returns its interleaved PCM.
    pub fn decode_frame(&mut self, reader: &mut ByteReader<'_>) -> Result<Vec<f32>> {
        let header = FrameHeader::read(reader)?;

        if header.frame_samples > self.sample_rate {
            return bitstream_error("frame sample count exceeds the sample rate");
        }
        let frame_samples = header.frame_samples as usize;

        let mut pcm = vec![0.0f32; frame_samples * self.channels];

        match header.frame_type {
            FrameType::Silence => {
                for _ in 0..self.channels {
                    let size = reader.read_u32()?;
                    reader.ignore_bytes(size as usize).map_err(|_| {
                        Error::ChannelSizeMismatch {
                            declared: size,
                            actual: reader.bytes_available() as u32,
                        }
                    })?;
                }
            }
            FrameType::Alpc(_) => {
                for ch in 0..self.channels {
                    let payload = self.read_channel_payload(reader)?;
                    lossless::decode_channel(
                        payload,
                        self.bit_depth,
                        frame_samples,
                        &mut self.ints,
                    )?;
                    for (i, &v) in self.ints.iter().enumerate() {
                        pcm[i * self.channels + ch] = dequantize(v, self.bit_depth);
                    }
                }
            }
            FrameType::Raw => {
                for ch in 0..self.channels {
                    let payload = self.read_channel_payload(reader)?;
                    decode_residuals(
                        payload,
                        ResidualCode::Raw,
                        self.bit_depth,
                        frame_samples,
                        &mut self.ints,
                    )?;
                    for (i, &v) in self.ints.iter().enumerate() {
                        pcm[i * self.channels + ch] = dequantize(v, self.bit_depth);
                    }
                }
            }
            FrameType::Transform => {
                let sample_rate = self.sample_rate;
                let transform =
                    self.transform.get_or_insert_with(|| TransformCodec::new(sample_rate));

                for (ch, state) in self.states.iter_mut().enumerate() {
                    let size = reader.read_u32()?;
                    let payload =
                        reader.read_buf_bytes_ref(size as usize).map_err(|_| {
                            Error::ChannelSizeMismatch {
                                declared: size,
                                actual: reader.bytes_available() as u32,
                            }
                        })?;

                    let mut blocks = ByteReader::new(payload);
                    while blocks.bytes_available() > 0 {
                        let block = read_block(&mut blocks)?;
                        transform.decode_block(state, &block)?;
                    }

                    if state.available() < frame_samples {
                        return bitstream_error("transform frame is short of samples");
                    }
                    for i in 0..frame_samples {
                        // Available samples were just checked.
                        let sample = state.pop().unwrap();
                        pcm[i * self.channels + ch] = sample;
                    }
                }
            }
        }

        Ok(pcm)
    }

    fn read_channel_payload<'b>(&self, reader: &mut ByteReader<'b>) -> Result<&'b [u8]> {
        let size = reader.read_u32()?;
        reader.read_buf_bytes_ref(size as usize).map_err(|_| Error::ChannelSizeMismatch {
            declared: size,
            actual: reader.bytes_available() as u32,
        })
    }
}
