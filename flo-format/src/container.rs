// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `container` module provides the whole-file reader and writer.
//!
//! The reader borrows the file bytes and splits them into header, TOC, and the three payload
//! chunks using the sizes the header declares. CRC verification is deliberately a separate
//! operation so that damaged or partially written files remain inspectable.

use log::debug;

use flo_core::checksum::Crc32;
use flo_core::errors::{Error, Result};
use flo_core::io::{ByteReader, ByteWriter};

use crate::header::{FileHeader, DATA_CRC32_OFFSET, FLO_MAGIC, HEADER_SIZE};
use crate::toc::{read_toc, TocEntry};

/// A parsed view over a flo file. The chunk slices borrow the input buffer.
pub struct ContainerRef<'a> {
    pub header: FileHeader,
    pub toc: Vec<TocEntry>,
    pub data: &'a [u8],
    pub extra: &'a [u8],
    pub meta: &'a [u8],
}

impl<'a> ContainerRef<'a> {
    /// Parses a flo file from a byte slice.
    pub fn parse(buf: &'a [u8]) -> Result<ContainerRef<'a>> {
        let mut reader = ByteReader::new(buf);

        let magic = reader.read_buf_bytes_ref(4).map_err(|_| Error::BadMagic)?;
        if magic != FLO_MAGIC {
            return Err(Error::BadMagic);
        }

        if reader.bytes_available() < HEADER_SIZE as usize {
            return Err(Error::TruncatedChunk("header"));
        }

        let header = FileHeader::read(&mut reader)?;

        let declared = 4
            + HEADER_SIZE
            + header.toc_size
            + header.data_size
            + header.extra_size
            + header.meta_size;

        if declared != buf.len() as u64 {
            return Err(Error::SizeInconsistent("chunk sizes do not sum to the file length"));
        }

        let toc_buf = reader
            .read_buf_bytes_ref(header.toc_size as usize)
            .map_err(|_| Error::TruncatedChunk("toc"))?;
        let data = reader
            .read_buf_bytes_ref(header.data_size as usize)
            .map_err(|_| Error::TruncatedChunk("data"))?;
        let extra = reader
            .read_buf_bytes_ref(header.extra_size as usize)
            .map_err(|_| Error::TruncatedChunk("extra"))?;
        let meta = reader
            .read_buf_bytes_ref(header.meta_size as usize)
            .map_err(|_| Error::TruncatedChunk("meta"))?;

        let toc = read_toc(toc_buf, header.data_size)?;

        debug!(
            "parsed container: {} toc entries, data={}B, extra={}B, meta={}B",
            toc.len(),
            data.len(),
            extra.len(),
            meta.len()
        );

        Ok(ContainerRef { header, toc, data, extra, meta })
    }

    /// Recomputes the DATA chunk checksum and compares it against the header.
    pub fn verify_data_crc(&self) -> Result<()> {
        let mut crc32 = Crc32::new();
        crc32.process_buf_bytes(self.data);

        let actual = crc32.crc();
        if actual != self.header.data_crc32 {
            return Err(Error::CrcMismatch { expected: self.header.data_crc32, actual });
        }

        Ok(())
    }
}

/// Serializes a complete flo file.
///
/// The chunk size fields and the DATA checksum of `header` are overwritten from the actual
/// chunks; callers fill in only the audio parameters. Output is deterministic byte-for-byte for
/// identical inputs.
pub fn write_container(
    header: &FileHeader,
    toc: &[TocEntry],
    data: &[u8],
    extra: &[u8],
    meta: &[u8],
) -> Vec<u8> {
    let mut header = header.clone();
    header.toc_size = toc.len() as u64 * crate::toc::TOC_ENTRY_SIZE;
    header.data_size = data.len() as u64;
    header.extra_size = extra.len() as u64;
    header.meta_size = meta.len() as u64;

    // The CRC is written as a placeholder and patched once DATA is in place.
    header.data_crc32 = 0;

    let total = 4
        + HEADER_SIZE
        + header.toc_size
        + header.data_size
        + header.extra_size
        + header.meta_size;

    let mut writer = ByteWriter::with_capacity(total as usize);

    writer.write_buf_bytes(&FLO_MAGIC);
    header.write(&mut writer);

    for entry in toc {
        entry.write(&mut writer);
    }

    writer.write_buf_bytes(data);
    writer.write_buf_bytes(extra);
    writer.write_buf_bytes(meta);

    let mut crc32 = Crc32::new();
    crc32.process_buf_bytes(data);
    writer.patch_u32(DATA_CRC32_OFFSET, crc32.crc());

    writer.into_bytes()
}
