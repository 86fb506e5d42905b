// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `decoder` module provides whole-file decoding, stream inspection, and CRC validation.

use log::debug;

use flo_core::errors::{unsupported_error, Error, Result};
use flo_core::io::ByteReader;

use flo_format::container::ContainerRef;
use flo_format::frame::FrameHeader;
use flo_format::header::FileHeader;

use crate::frame::FrameDecoder;
use crate::quality::QualityPreset;

/// Fully decoded audio.
pub struct DecodedAudio {
    /// Interleaved samples in [-1, 1].
    pub pcm: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u8,
    /// Samples per channel.
    pub total_samples: u64,
}

/// Stream information reported without decoding any audio.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub sample_rate: u32,
    pub channels: u8,
    pub bit_depth: u8,
    pub duration_secs: f64,
    /// Samples per channel.
    pub total_samples: u64,
    pub is_lossy: bool,
    /// The canonical quality of the recorded preset, for lossy files.
    pub lossy_quality: Option<f32>,
    /// Raw PCM size at the declared bit depth over the encoded file size.
    pub compression_ratio: f64,
}

fn check_params(header: &FileHeader) -> Result<()> {
    if header.sample_rate < 8_000 || header.sample_rate > 192_000 {
        return unsupported_error("sample rate out of range");
    }
    if header.channels != 1 && header.channels != 2 {
        return unsupported_error("channel count out of range");
    }
    if header.bit_depth != 16 && header.bit_depth != 24 && header.bit_depth != 32 {
        return unsupported_error("bit depth out of range");
    }
    Ok(())
}

/// Decodes an entire flo file into interleaved PCM.
///
/// A frame-level failure fails the whole operation; no partial PCM is returned.
pub fn decode(file: &[u8]) -> Result<DecodedAudio> {
    let container = ContainerRef::parse(file)?;
    check_params(&container.header)?;

    let channels = container.header.channels;
    let mut decoder = FrameDecoder::new(
        container.header.sample_rate,
        usize::from(channels),
        u32::from(container.header.bit_depth),
    );

    let mut reader = ByteReader::new(container.data);
    let mut pcm = Vec::new();
    let mut frames = 0u64;

    while reader.bytes_available() > 0 {
        pcm.extend_from_slice(&decoder.decode_frame(&mut reader)?);
        frames += 1;
    }

    debug!("decoded {} frames, {} samples", frames, pcm.len());

    let total_samples = (pcm.len() / usize::from(channels)) as u64;

    Ok(DecodedAudio {
        pcm,
        sample_rate: container.header.sample_rate,
        channels,
        total_samples,
    })
}

/// Counts samples per channel from the TOC and the final frame's header.
///
/// The TOC is authoritative for duration: a header whose `total_frames` disagrees with the
/// table is tolerated.
fn count_samples(container: &ContainerRef<'_>) -> Result<u64> {
    let Some(last) = container.toc.last() else {
        return Ok(0);
    };

    let mut reader = ByteReader::new(container.data);
    reader
        .ignore_bytes(last.byte_offset as usize)
        .map_err(|_| Error::CorruptToc("last entry offset out of range"))?;

    let header = FrameHeader::read(&mut reader)?;

    let whole_frames = container.toc.len() as u64 - 1;
    Ok(whole_frames * u64::from(container.header.sample_rate) + u64::from(header.frame_samples))
}

/// Reports stream information without decoding audio.
pub fn info(file: &[u8]) -> Result<FileInfo> {
    let container = ContainerRef::parse(file)?;
    check_params(&container.header)?;

    let header = &container.header;
    let total_samples = count_samples(&container)?;
    let duration_secs = total_samples as f64 / f64::from(header.sample_rate);

    let raw_size =
        total_samples as f64 * f64::from(header.channels) * f64::from(header.bit_depth) / 8.0;
    let compression_ratio = if file.is_empty() { 0.0 } else { raw_size / file.len() as f64 };

    let lossy_quality = if header.is_lossy() {
        QualityPreset::from_level(header.quality_level()).map(|p| p.quality())
    }
    else {
        None
    };

    Ok(FileInfo {
        sample_rate: header.sample_rate,
        channels: header.channels,
        bit_depth: header.bit_depth,
        duration_secs,
        total_samples,
        is_lossy: header.is_lossy(),
        lossy_quality,
        compression_ratio,
    })
}

/// Verifies the DATA chunk against the checksum in the header.
///
/// Returns `Ok(false)` on a checksum mismatch; container-level parse failures are still
/// errors. No other operation checks the CRC, so damaged files remain decodable best-effort.
pub fn validate(file: &[u8]) -> Result<bool> {
    let container = ContainerRef::parse(file)?;

    match container.verify_data_crc() {
        Ok(()) => Ok(true),
        Err(Error::CrcMismatch { .. }) => Ok(false),
        Err(err) => Err(err),
    }
}
