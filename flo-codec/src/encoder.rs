// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `encoder` module composes the frame codec over a whole PCM buffer: frame splitting,
//! table-of-contents generation, checksumming, and container assembly.

use log::debug;

use flo_core::errors::{unsupported_error, Result};

use flo_format::container::write_container;
use flo_format::header::FileHeader;
use flo_format::meta::MetadataRecord;
use flo_format::toc::TocEntry;

use crate::frame::{assemble_transform_frame, encode_lossless_frame};
use crate::lossy::TransformCodec;
use crate::quality::{quality_for_bitrate, QualityPreset};

fn validate_params(pcm: &[f32], sample_rate: u32, channels: u8, bit_depth: u8) -> Result<()> {
    if sample_rate < 8_000 || sample_rate > 192_000 {
        return unsupported_error("sample rate out of range");
    }
    if channels != 1 && channels != 2 {
        return unsupported_error("channel count out of range");
    }
    if bit_depth != 16 && bit_depth != 24 && bit_depth != 32 {
        return unsupported_error("bit depth out of range");
    }
    if pcm.len() % usize::from(channels) != 0 {
        return unsupported_error("pcm length is not a whole number of channels");
    }
    Ok(())
}

fn meta_bytes(metadata: Option<&MetadataRecord>) -> Result<Vec<u8>> {
    match metadata {
        Some(record) => record.to_msgpack(),
        None => Ok(Vec::new()),
    }
}

fn build_file(mut header: FileHeader, frames: Vec<Vec<u8>>, meta: Vec<u8>) -> Vec<u8> {
    let mut toc = Vec::with_capacity(frames.len());
    let mut data = Vec::new();

    // Frames are one second each, so timestamps fall on whole seconds.
    for (index, frame) in frames.iter().enumerate() {
        toc.push(TocEntry {
            frame_index: index as u32,
            byte_offset: data.len() as u64,
            frame_size: frame.len() as u32,
            timestamp_ms: index as u32 * 1000,
        });
        data.extend_from_slice(frame);
    }

    header.total_frames = frames.len() as u64;

    write_container(&header, &toc, &data, &[], &meta)
}

/// Encodes PCM losslessly. `level` (0-9) bounds the predictor order search.
pub fn encode_lossless(
    pcm: &[f32],
    sample_rate: u32,
    channels: u8,
    bit_depth: u8,
    level: u8,
    metadata: Option<&MetadataRecord>,
) -> Result<Vec<u8>> {
    validate_params(pcm, sample_rate, channels, bit_depth)?;
    if level > 9 {
        return unsupported_error("compression level out of range");
    }

    let ch = usize::from(channels);
    let total = pcm.len() / ch;
    let rate = sample_rate as usize;

    let mut frames = Vec::new();
    let mut deinterleaved: Vec<Vec<f32>> = vec![Vec::with_capacity(rate); ch];

    let mut start = 0usize;
    while start < total {
        let end = (start + rate).min(total);

        for (c, channel) in deinterleaved.iter_mut().enumerate() {
            channel.clear();
            channel.extend((start..end).map(|i| pcm[i * ch + c]));
        }

        let slices: Vec<&[f32]> = deinterleaved.iter().map(|c| c.as_slice()).collect();
        frames.push(encode_lossless_frame(&slices, u32::from(bit_depth), level));

        start = end;
    }

    debug!("lossless encode: {} frames, level {}", frames.len(), level);

    let mut header = FileHeader::new(sample_rate, channels, bit_depth);
    header.compression_level = level;

    Ok(build_file(header, frames, meta_bytes(metadata)?))
}

/// Encodes PCM with the lossy transform coder at a quality in [0, 1].
pub fn encode_lossy(
    pcm: &[f32],
    sample_rate: u32,
    channels: u8,
    bit_depth: u8,
    quality: f32,
    metadata: Option<&MetadataRecord>,
) -> Result<Vec<u8>> {
    validate_params(pcm, sample_rate, channels, bit_depth)?;
    if !(0.0..=1.0).contains(&quality) || quality.is_nan() {
        return unsupported_error("quality out of range");
    }

    let ch = usize::from(channels);
    let total = pcm.len() / ch;
    let rate = sample_rate as usize;

    let codec = TransformCodec::new(sample_rate);

    // Encode every channel's complete block stream, then packetize: a frame takes blocks from
    // each channel until that channel's decoded output covers the frame.
    let streams: Vec<_> = (0..ch)
        .map(|c| {
            let channel: Vec<f32> = (0..total).map(|i| pcm[i * ch + c]).collect();
            codec.encode_channel(&channel, quality)
        })
        .collect();

    let n_frames = if total == 0 { 0 } else { (total + rate - 1) / rate };
    let mut cursors = vec![0usize; ch];
    let mut frames = Vec::with_capacity(n_frames);

    for f in 0..n_frames {
        let target = ((f + 1) * rate).min(total);
        let frame_samples = (target - f * rate) as u32;

        let mut payloads = Vec::with_capacity(ch);
        for (c, stream) in streams.iter().enumerate() {
            let mut payload = Vec::new();

            while cursors[c] < stream.len() {
                let block = &stream[cursors[c]];
                payload.extend_from_slice(&block.bytes);
                cursors[c] += 1;

                if block.emitted_after >= target {
                    break;
                }
            }

            payloads.push(payload);
        }

        frames.push(assemble_transform_frame(frame_samples, &payloads));
    }

    debug!("lossy encode: {} frames at quality {:.2}", frames.len(), quality);

    let mut header = FileHeader::new(sample_rate, channels, bit_depth);
    header.set_lossy(QualityPreset::nearest(quality).level());

    Ok(build_file(header, frames, meta_bytes(metadata)?))
}

/// Encodes PCM lossily at a quality derived from a target bitrate.
pub fn encode_with_bitrate(
    pcm: &[f32],
    sample_rate: u32,
    channels: u8,
    bit_depth: u8,
    bitrate_kbps: u32,
    metadata: Option<&MetadataRecord>,
) -> Result<Vec<u8>> {
    let quality = quality_for_bitrate(bitrate_kbps, sample_rate, channels);
    encode_lossy(pcm, sample_rate, channels, bit_depth, quality, metadata)
}
