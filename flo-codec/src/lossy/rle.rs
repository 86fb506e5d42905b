// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `rle` module provides the sparse run-length coefficient stream.
//!
//! A quantized spectrum is mostly zero. The stream is a sequence of groups, each a LEB128
//! zero-run length, a u8 count of non-zero values, then that many little-endian i16 values.
//! Trailing zeros are implied by the end of the stream.

use flo_core::errors::{transform_error, Result};
use flo_core::io::{ByteReader, ByteWriter};

fn write_leb128(writer: &mut ByteWriter, mut value: u32) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;

        if value == 0 {
            writer.write_u8(byte);
            break;
        }

        writer.write_u8(byte | 0x80);
    }
}

fn read_leb128(reader: &mut ByteReader<'_>) -> Result<u32> {
    let mut value = 0u32;
    let mut shift = 0u32;

    loop {
        let byte = reader.read_u8()?;
        if shift >= 32 {
            return transform_error("zero run length overflows");
        }

        value |= u32::from(byte & 0x7f) << shift;

        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    Ok(value)
}

/// Encodes a quantized coefficient vector as a sparse stream.
pub fn encode_coeffs(coeffs: &[i16]) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    let mut pos = 0usize;

    while pos < coeffs.len() {
        let run_start = pos;
        while pos < coeffs.len() && coeffs[pos] == 0 {
            pos += 1;
        }

        if pos == coeffs.len() {
            // Trailing zeros are implied.
            break;
        }

        let group_start = pos;
        while pos < coeffs.len() && coeffs[pos] != 0 && pos - group_start < 255 {
            pos += 1;
        }

        write_leb128(&mut writer, (group_start - run_start) as u32);
        writer.write_u8((pos - group_start) as u8);
        for &value in &coeffs[group_start..pos] {
            writer.write_u16(value as u16);
        }
    }

    writer.into_bytes()
}

/// Decodes a sparse stream of exactly `buf.len()` bytes into `n_coeffs` coefficients.
pub fn decode_coeffs(buf: &[u8], n_coeffs: usize, out: &mut Vec<i16>) -> Result<()> {
    out.clear();
    out.resize(n_coeffs, 0);

    let mut reader = ByteReader::new(buf);
    let mut pos = 0usize;

    while reader.bytes_available() > 0 {
        let run = read_leb128(&mut reader)? as usize;
        let count = usize::from(reader.read_u8()?);

        pos = pos
            .checked_add(run)
            .filter(|&p| count <= n_coeffs && p <= n_coeffs - count)
            .ok_or(flo_core::errors::Error::TransformOverflow("coefficients overflow the block"))?;

        for _ in 0..count {
            out[pos] = reader.read_u16()? as i16;
            pos += 1;
        }
    }

    Ok(())
}
