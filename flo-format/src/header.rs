// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `header` module provides the fixed file header record.

use bitflags::bitflags;

use flo_core::errors::{Error, Result};
use flo_core::io::{ByteReader, ByteWriter};

/// The flo magic signature, "FLO!".
pub const FLO_MAGIC: [u8; 4] = [0x46, 0x4c, 0x4f, 0x21];

/// The size of the header record in bytes, excluding the magic signature.
pub const HEADER_SIZE: u64 = 66;

/// The format major version this implementation reads and writes.
pub const FORMAT_MAJOR: u8 = 1;
/// The format minor version this implementation writes.
pub const FORMAT_MINOR: u8 = 1;

/// Byte offset of the `data_crc32` field from the start of the file.
pub const DATA_CRC32_OFFSET: usize = 26;
/// Byte offset of the `meta_size` field from the start of the file.
pub const META_SIZE_OFFSET: usize = 62;

bitflags! {
    /// The header flag word. Bit 0 marks a lossy file; bits 8-11 carry the quality level.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HeaderFlags: u16 {
        const LOSSY = 0x0001;
        const QUALITY_LEVEL = 0x0f00;

        // Undefined bits must survive a read-modify-write cycle.
        const _ = !0;
    }
}

/// The fixed file header.
///
/// Every multi-byte field is little-endian on the wire. The header is written once at encode
/// time and is immutable afterwards with two exceptions: `data_crc32` is back-patched by the
/// container writer once the DATA chunk exists, and `meta_size` is rewritten by the metadata
/// update operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub major: u8,
    pub minor: u8,
    pub flags: HeaderFlags,
    pub sample_rate: u32,
    pub channels: u8,
    pub bit_depth: u8,
    /// Count of one-second frames, including a shorter final frame.
    pub total_frames: u64,
    /// Lossless order-search effort hint, 0-9.
    pub compression_level: u8,
    /// CRC32 over the entire DATA chunk.
    pub data_crc32: u32,
    pub toc_size: u64,
    pub data_size: u64,
    pub extra_size: u64,
    pub meta_size: u64,
}

impl FileHeader {
    /// Instantiate a header for a new file with the given audio parameters.
    pub fn new(sample_rate: u32, channels: u8, bit_depth: u8) -> FileHeader {
        FileHeader {
            major: FORMAT_MAJOR,
            minor: FORMAT_MINOR,
            flags: HeaderFlags::empty(),
            sample_rate,
            channels,
            bit_depth,
            total_frames: 0,
            compression_level: 0,
            data_crc32: 0,
            toc_size: 0,
            data_size: 0,
            extra_size: 0,
            meta_size: 0,
        }
    }

    /// Returns true if the DATA chunk was produced by the lossy transform coder.
    pub fn is_lossy(&self) -> bool {
        self.flags.contains(HeaderFlags::LOSSY)
    }

    /// The quality level (0-4) recorded for a lossy file.
    pub fn quality_level(&self) -> u8 {
        ((self.flags.bits() & HeaderFlags::QUALITY_LEVEL.bits()) >> 8) as u8
    }

    /// Marks the file as lossy at the given quality level (0-4).
    pub fn set_lossy(&mut self, quality_level: u8) {
        debug_assert!(quality_level <= 4);
        let bits = self.flags.bits() | HeaderFlags::LOSSY.bits() | (u16::from(quality_level) << 8);
        self.flags = HeaderFlags::from_bits_retain(bits);
    }

    /// Reads the header record. The magic signature must already have been consumed.
    pub fn read(reader: &mut ByteReader<'_>) -> Result<FileHeader> {
        let major = reader.read_u8()?;
        let minor = reader.read_u8()?;

        if major != FORMAT_MAJOR || minor < 1 {
            return Err(Error::UnsupportedVersion { major, minor });
        }

        let flags = HeaderFlags::from_bits_retain(reader.read_u16()?);
        let sample_rate = reader.read_u32()?;
        let channels = reader.read_u8()?;
        let bit_depth = reader.read_u8()?;
        let total_frames = reader.read_u64()?;
        let compression_level = reader.read_u8()?;

        // Reserved bytes. Writers must zero them; readers ignore their value so that a future
        // minor version can assign them.
        reader.ignore_bytes(3)?;

        let data_crc32 = reader.read_u32()?;

        let header_size = reader.read_u64()?;
        if header_size != HEADER_SIZE {
            return Err(Error::SizeInconsistent("unexpected header size"));
        }

        let toc_size = reader.read_u64()?;
        let data_size = reader.read_u64()?;
        let extra_size = reader.read_u64()?;
        let meta_size = reader.read_u64()?;

        Ok(FileHeader {
            major,
            minor,
            flags,
            sample_rate,
            channels,
            bit_depth,
            total_frames,
            compression_level,
            data_crc32,
            toc_size,
            data_size,
            extra_size,
            meta_size,
        })
    }

    /// Writes the header record, excluding the magic signature.
    pub fn write(&self, writer: &mut ByteWriter) {
        writer.write_u8(self.major);
        writer.write_u8(self.minor);
        writer.write_u16(self.flags.bits());
        writer.write_u32(self.sample_rate);
        writer.write_u8(self.channels);
        writer.write_u8(self.bit_depth);
        writer.write_u64(self.total_frames);
        writer.write_u8(self.compression_level);
        writer.write_u8(0);
        writer.write_u8(0);
        writer.write_u8(0);
        writer.write_u32(self.data_crc32);
        writer.write_u64(HEADER_SIZE);
        writer.write_u64(self.toc_size);
        writer.write_u64(self.data_size);
        writer.write_u64(self.extra_size);
        writer.write_u64(self.meta_size);
    }
}
