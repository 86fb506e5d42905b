// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `frame` module provides the wire records shared by both codecs: the per-frame header and
//! the small tagged unions embedded in channel payloads.

use flo_core::errors::{Error, Result};
use flo_core::io::{ByteReader, ByteWriter};

/// The size of a frame header in bytes: type tag, sample count, and flags.
pub const FRAME_HEADER_SIZE: usize = 6;

/// The compression scheme of a frame, tagged by the first byte of the frame record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// All channels are digital silence; channel payloads are empty.
    Silence,
    /// Adaptive linear prediction. The payload order is the maximum across channels; each
    /// channel's payload carries its own, possibly smaller, coefficient count.
    Alpc(u8),
    /// The lossy transform coder: a sequence of windowed MDCT block records.
    Transform,
    /// Uncompressed integer PCM at the declared bit depth.
    Raw,
}

impl FrameType {
    pub fn from_tag(tag: u8) -> Result<FrameType> {
        match tag {
            0 => Ok(FrameType::Silence),
            1..=12 => Ok(FrameType::Alpc(tag)),
            253 => Ok(FrameType::Transform),
            254 => Ok(FrameType::Raw),
            _ => Err(Error::UnknownFrameType(tag)),
        }
    }

    pub fn tag(&self) -> u8 {
        match *self {
            FrameType::Silence => 0,
            FrameType::Alpc(order) => order,
            FrameType::Transform => 253,
            FrameType::Raw => 254,
        }
    }
}

/// The header of one frame record within the DATA chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_type: FrameType,
    /// Number of samples per channel in this frame. Equals the sample rate except for a shorter
    /// final frame.
    pub frame_samples: u32,
    pub flags: u8,
}

impl FrameHeader {
    pub fn read(reader: &mut ByteReader<'_>) -> Result<FrameHeader> {
        let frame_type = FrameType::from_tag(reader.read_u8()?)?;
        let frame_samples = reader.read_u32()?;
        let flags = reader.read_u8()?;
        Ok(FrameHeader { frame_type, frame_samples, flags })
    }

    pub fn write(&self, writer: &mut ByteWriter) {
        writer.write_u8(self.frame_type.tag());
        writer.write_u32(self.frame_samples);
        writer.write_u8(self.flags);
    }
}

/// The entropy coding applied to an ALPC residual stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidualEncoding {
    Rice,
    Golomb,
    Raw,
}

impl ResidualEncoding {
    pub fn from_tag(tag: u8) -> Result<ResidualEncoding> {
        match tag {
            0 => Ok(ResidualEncoding::Rice),
            1 => Ok(ResidualEncoding::Golomb),
            2 => Ok(ResidualEncoding::Raw),
            _ => Err(Error::TruncatedBitstream("reserved residual encoding")),
        }
    }

    pub fn tag(&self) -> u8 {
        match *self {
            ResidualEncoding::Rice => 0,
            ResidualEncoding::Golomb => 1,
            ResidualEncoding::Raw => 2,
        }
    }
}

/// The window shape of one transform block.
///
/// Long, start, and stop blocks are all 2048 samples wide; short blocks are 256. Start and stop
/// blocks carry asymmetric windows so that a long-to-short transition overlap-adds perfectly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Long,
    Short,
    Start,
    Stop,
}

impl BlockKind {
    pub fn from_tag(tag: u8) -> Result<BlockKind> {
        match tag {
            0 => Ok(BlockKind::Long),
            1 => Ok(BlockKind::Short),
            2 => Ok(BlockKind::Start),
            3 => Ok(BlockKind::Stop),
            _ => Err(Error::TransformOverflow("reserved block kind")),
        }
    }

    pub fn tag(&self) -> u8 {
        match *self {
            BlockKind::Long => 0,
            BlockKind::Short => 1,
            BlockKind::Start => 2,
            BlockKind::Stop => 3,
        }
    }

    /// The input width of this block's window in samples.
    pub fn block_size(&self) -> usize {
        match *self {
            BlockKind::Short => 256,
            _ => 2048,
        }
    }

    /// The number of MDCT coefficients this block carries.
    pub fn coeff_count(&self) -> usize {
        self.block_size() / 2
    }

    /// Returns true if `next` may legally follow this block.
    pub fn may_precede(&self, next: BlockKind) -> bool {
        match *self {
            BlockKind::Long => matches!(next, BlockKind::Long | BlockKind::Start),
            BlockKind::Start => matches!(next, BlockKind::Short),
            BlockKind::Short => matches!(next, BlockKind::Short | BlockKind::Stop),
            BlockKind::Stop => matches!(next, BlockKind::Long | BlockKind::Start),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_frame_type_tags() {
        for tag in 0..=u8::MAX {
            match FrameType::from_tag(tag) {
                Ok(frame_type) => assert_eq!(frame_type.tag(), tag),
                Err(_) => assert!((13..=252).contains(&tag) || tag == 255),
            }
        }
    }

    #[test]
    fn verify_frame_header_round_trip() {
        let header = FrameHeader {
            frame_type: FrameType::Alpc(8),
            frame_samples: 44100,
            flags: 0,
        };

        let mut writer = ByteWriter::new();
        header.write(&mut writer);

        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), FRAME_HEADER_SIZE);

        let parsed = FrameHeader::read(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn verify_block_sequences() {
        use BlockKind::*;

        assert!(Long.may_precede(Long));
        assert!(Long.may_precede(Start));
        assert!(Start.may_precede(Short));
        assert!(Short.may_precede(Short));
        assert!(Short.may_precede(Stop));
        assert!(Stop.may_precede(Long));

        assert!(!Long.may_precede(Short));
        assert!(!Long.may_precede(Stop));
        assert!(!Start.may_precede(Long));
        assert!(!Short.may_precede(Long));
        assert!(!Stop.may_precede(Short));
    }
}
