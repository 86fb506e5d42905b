// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `toc` module provides the table-of-contents seek index.

use flo_core::errors::{corrupt_toc_error, Result};
use flo_core::io::{ByteReader, ByteWriter};

/// The size of one table-of-contents entry in bytes.
pub const TOC_ENTRY_SIZE: u64 = 20;

/// One entry of the table of contents.
///
/// Entries are strictly ascending by both `frame_index` and `byte_offset`. A table typically
/// carries one entry per frame, but a sparser index is legal as long as it stays monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocEntry {
    pub frame_index: u32,
    /// Byte offset of the frame, relative to the start of the DATA chunk.
    pub byte_offset: u64,
    pub frame_size: u32,
    pub timestamp_ms: u32,
}

impl TocEntry {
    pub fn read(reader: &mut ByteReader<'_>) -> Result<TocEntry> {
        Ok(TocEntry {
            frame_index: reader.read_u32()?,
            byte_offset: reader.read_u64()?,
            frame_size: reader.read_u32()?,
            timestamp_ms: reader.read_u32()?,
        })
    }

    pub fn write(&self, writer: &mut ByteWriter) {
        writer.write_u32(self.frame_index);
        writer.write_u64(self.byte_offset);
        writer.write_u32(self.frame_size);
        writer.write_u32(self.timestamp_ms);
    }
}

/// Parses a TOC chunk and validates it against the DATA chunk length.
pub fn read_toc(buf: &[u8], data_len: u64) -> Result<Vec<TocEntry>> {
    if buf.len() as u64 % TOC_ENTRY_SIZE != 0 {
        return corrupt_toc_error("chunk length is not a multiple of the entry size");
    }

    let mut reader = ByteReader::new(buf);
    let mut entries = Vec::with_capacity(buf.len() / TOC_ENTRY_SIZE as usize);

    let mut prev: Option<TocEntry> = None;

    while reader.bytes_available() > 0 {
        let entry = TocEntry::read(&mut reader)?;

        if let Some(prev) = prev {
            if entry.frame_index <= prev.frame_index {
                return corrupt_toc_error("frame indicies are not strictly ascending");
            }
            if entry.byte_offset <= prev.byte_offset {
                return corrupt_toc_error("byte offsets are not strictly ascending");
            }
        }

        if entry.byte_offset + u64::from(entry.frame_size) > data_len {
            return corrupt_toc_error("entry extends past the end of the DATA chunk");
        }

        prev = Some(entry);
        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_entries(entries: &[TocEntry]) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        for entry in entries {
            entry.write(&mut writer);
        }
        writer.into_bytes()
    }

    #[test]
    fn verify_toc_round_trip() {
        let entries = [
            TocEntry { frame_index: 0, byte_offset: 0, frame_size: 100, timestamp_ms: 0 },
            TocEntry { frame_index: 1, byte_offset: 100, frame_size: 250, timestamp_ms: 1000 },
            TocEntry { frame_index: 2, byte_offset: 350, frame_size: 50, timestamp_ms: 2000 },
        ];

        let buf = write_entries(&entries);
        let parsed = read_toc(&buf, 400).unwrap();
        assert_eq!(parsed, entries);
    }

    #[test]
    fn verify_toc_rejects_non_monotonic() {
        let entries = [
            TocEntry { frame_index: 0, byte_offset: 100, frame_size: 100, timestamp_ms: 0 },
            TocEntry { frame_index: 1, byte_offset: 50, frame_size: 100, timestamp_ms: 1000 },
        ];

        let buf = write_entries(&entries);
        assert!(read_toc(&buf, 1000).is_err());
    }

    #[test]
    fn verify_toc_rejects_overrun() {
        let entries =
            [TocEntry { frame_index: 0, byte_offset: 0, frame_size: 500, timestamp_ms: 0 }];

        let buf = write_entries(&entries);
        assert!(read_toc(&buf, 400).is_err());
    }
}
