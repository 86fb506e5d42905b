// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use lazy_static::lazy_static;

lazy_static! {
    /// Table-driven CRC32 for the reflected IEEE 802.3 polynomial (0xedb88320).
    static ref CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];

        for (i, entry) in table.iter_mut().enumerate() {
            let mut crc = i as u32;

            for _ in 0..8 {
                crc = if crc & 1 != 0 { (crc >> 1) ^ 0xedb8_8320 } else { crc >> 1 };
            }

            *entry = crc;
        }

        table
    };
}

/// `Crc32` implements the IEEE 802.3 cyclic redundancy check as used by zlib and PNG: reflected
/// polynomial 0xedb88320, initial value 0xffffffff, final XOR 0xffffffff.
pub struct Crc32 {
    crc: u32,
}

impl Crc32 {
    /// Instantiate a new `Crc32`.
    pub fn new() -> Self {
        Crc32 { crc: 0xffff_ffff }
    }

    /// Process a single byte.
    #[inline(always)]
    pub fn process_byte(&mut self, byte: u8) {
        self.crc = (self.crc >> 8) ^ CRC32_TABLE[((self.crc ^ u32::from(byte)) & 0xff) as usize];
    }

    /// Process a buffer of bytes.
    pub fn process_buf_bytes(&mut self, buf: &[u8]) {
        for &byte in buf {
            self.process_byte(byte);
        }
    }

    /// Get the checksum of all bytes processed so far.
    pub fn crc(&self) -> u32 {
        self.crc ^ 0xffff_ffff
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Crc32::new()
    }
}

#[cfg(test)]
mod tests {
    use super::Crc32;

    #[test]
    fn verify_crc32_check_value() {
        // The standard CRC-32/ISO-HDLC check value.
        let mut crc32 = Crc32::new();
        crc32.process_buf_bytes(b"123456789");
        assert_eq!(crc32.crc(), 0xcbf4_3926);
    }

    #[test]
    fn verify_crc32_empty() {
        assert_eq!(Crc32::new().crc(), 0);
    }

    #[test]
    fn verify_crc32_incremental() {
        let mut whole = Crc32::new();
        whole.process_buf_bytes(b"hello, world");

        let mut split = Crc32::new();
        split.process_buf_bytes(b"hello,");
        split.process_buf_bytes(b" world");

        assert_eq!(whole.crc(), split.crc());
    }
}
