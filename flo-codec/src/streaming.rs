// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `streaming` module provides the incremental decoder.
//!
//! Bytes are fed in arbitrary chunks. The parser never consumes past an incomplete record:
//! a frame is decoded only once its header and every channel payload are fully buffered, so
//! `next_frame` either emits a whole frame or nothing. The DATA checksum cannot be verified
//! until the chunk ends and is not enforced in streaming mode.
//!
//! The handle is single-owner. A frame-level error is terminal for the stream: the decoder
//! does not resynchronize to a later table-of-contents entry.

use log::debug;

use flo_core::errors::{Error, Result};
use flo_core::io::ByteReader;

use flo_format::frame::FRAME_HEADER_SIZE;
use flo_format::header::{FileHeader, FLO_MAGIC, HEADER_SIZE};
use flo_format::toc::read_toc;

use crate::frame::FrameDecoder;

/// Audio parameters available once the fixed header has been parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub sample_rate: u32,
    pub channels: u8,
    pub bit_depth: u8,
    pub total_frames: u64,
    pub is_lossy: bool,
}

/// An incremental flo decoder. Feed bytes, poll for frames.
pub struct StreamingDecoder {
    /// Append-only input buffer; `pos` is the parse cursor within it. Keeping consumed bytes
    /// around lets `reset` replay the stream from the start.
    buf: Vec<u8>,
    pos: usize,
    header: Option<FileHeader>,
    toc_done: bool,
    data_consumed: u64,
    decoder: Option<FrameDecoder>,
    frame_index: u64,
}

impl StreamingDecoder {
    pub fn new() -> StreamingDecoder {
        StreamingDecoder {
            buf: Vec::new(),
            pos: 0,
            header: None,
            toc_done: false,
            data_consumed: 0,
            decoder: None,
            frame_index: 0,
        }
    }

    /// Appends bytes to the input buffer. Never blocks, never parses.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// The audio parameters, once enough bytes have arrived to parse the header.
    pub fn get_info(&self) -> Option<StreamInfo> {
        self.header.as_ref().map(|h| StreamInfo {
            sample_rate: h.sample_rate,
            channels: h.channels,
            bit_depth: h.bit_depth,
            total_frames: h.total_frames,
            is_lossy: h.is_lossy(),
        })
    }

    /// Discards all parsed state but keeps the fed bytes; the next poll re-parses from the
    /// start of the buffer.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.header = None;
        self.toc_done = false;
        self.data_consumed = 0;
        self.decoder = None;
        self.frame_index = 0;
    }

    /// Tries to parse the magic and fixed header. Returns false if more bytes are needed.
    fn parse_header(&mut self) -> Result<bool> {
        if self.buf.len() < 4 + HEADER_SIZE as usize {
            return Ok(false);
        }

        if self.buf[..4] != FLO_MAGIC {
            return Err(Error::BadMagic);
        }

        let mut reader = ByteReader::new(&self.buf[4..4 + HEADER_SIZE as usize]);
        let header = FileHeader::read(&mut reader)?;

        debug!(
            "stream header: {} Hz, {} ch, {} frames",
            header.sample_rate, header.channels, header.total_frames
        );

        self.decoder = Some(FrameDecoder::new(
            header.sample_rate,
            usize::from(header.channels),
            u32::from(header.bit_depth),
        ));
        self.header = Some(header);
        self.pos = 4 + HEADER_SIZE as usize;

        Ok(true)
    }

    /// Measures the next frame record in `slice`, or returns `None` when it is incomplete.
    /// `data_left` bounds how long the frame may legally be.
    fn frame_len(slice: &[u8], channels: usize, data_left: u64) -> Result<Option<usize>> {
        let mut need = FRAME_HEADER_SIZE;

        for _ in 0..channels {
            if need as u64 + 4 > data_left {
                return Err(Error::TruncatedChunk("frame extends past the data chunk"));
            }
            if need + 4 > slice.len() {
                return Ok(None);
            }

            let size =
                u32::from_le_bytes([slice[need], slice[need + 1], slice[need + 2], slice[need + 3]]);
            need += 4 + size as usize;
        }

        if need as u64 > data_left {
            return Err(Error::TruncatedChunk("frame extends past the data chunk"));
        }
        if need > slice.len() {
            return Ok(None);
        }

        Ok(Some(need))
    }

    /// Decodes the next fully buffered frame.
    ///
    /// Returns `Ok(None)` when more bytes are needed (or the DATA chunk is exhausted);
    /// a malformed frame returns an error.
    pub fn next_frame(&mut self) -> Result<Option<Vec<f32>>> {
        if self.header.is_none() && !self.parse_header()? {
            return Ok(None);
        }

        // The headers are parsed before this point, so unwrapping is fine.
        let header = self.header.as_ref().unwrap();
        let toc_size = header.toc_size as usize;
        let data_size = header.data_size;
        let channels = usize::from(header.channels);

        if !self.toc_done {
            if self.buf.len() - self.pos < toc_size {
                return Ok(None);
            }

            // Validate the table even though streaming playback does not seek by it.
            read_toc(&self.buf[self.pos..self.pos + toc_size], data_size)?;

            self.pos += toc_size;
            self.toc_done = true;
        }

        if self.data_consumed == data_size {
            // Anything after DATA is EXTRA and META; not the streaming decoder's business.
            return Ok(None);
        }

        let data_left = data_size - self.data_consumed;
        let avail = (self.buf.len() - self.pos).min(data_left as usize);
        let slice = &self.buf[self.pos..self.pos + avail];

        let Some(len) = Self::frame_len(slice, channels, data_left)? else {
            return Ok(None);
        };

        let mut reader = ByteReader::new(&slice[..len]);
        let pcm = self.decoder.as_mut().unwrap().decode_frame(&mut reader)?;

        self.pos += len;
        self.data_consumed += len as u64;
        self.frame_index += 1;

        Ok(Some(pcm))
    }

    /// Drains every fully buffered frame, concatenating the PCM.
    pub fn decode_available(&mut self) -> Result<Vec<f32>> {
        let mut pcm = Vec::new();
        while let Some(frame) = self.next_frame()? {
            pcm.extend_from_slice(&frame);
        }
        Ok(pcm)
    }

    /// The index of the next frame to be emitted.
    pub fn frames_decoded(&self) -> u64 {
        self.frame_index
    }
}

impl Default for StreamingDecoder {
    fn default() -> Self {
        StreamingDecoder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode_lossless;

    fn sine_pcm(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                0.6 * (2.0 * std::f64::consts::PI * 220.0 * i as f64 / 8000.0).sin() as f32
            })
            .collect()
    }

    #[test]
    fn verify_incremental_feeding() {
        let pcm = sine_pcm(8000 * 2);
        let file = encode_lossless(&pcm, 8000, 1, 16, 3, None).unwrap();

        let mut stream = StreamingDecoder::new();
        let mut out = Vec::new();

        // An awkward chunk size exercises every not-yet-buffered path.
        for chunk in file.chunks(97) {
            stream.feed(chunk);
            out.extend_from_slice(&stream.decode_available().unwrap());
        }

        let reference = crate::decoder::decode(&file).unwrap();
        assert_eq!(out, reference.pcm);
        assert_eq!(stream.frames_decoded(), 2);
    }

    #[test]
    fn verify_info_appears_after_header() {
        let pcm = sine_pcm(4000);
        let file = encode_lossless(&pcm, 8000, 1, 16, 3, None).unwrap();

        let mut stream = StreamingDecoder::new();
        assert!(stream.get_info().is_none());

        stream.feed(&file[..10]);
        assert!(stream.next_frame().unwrap().is_none());
        assert!(stream.get_info().is_none());

        stream.feed(&file[10..80]);
        let _ = stream.next_frame().unwrap();
        let info = stream.get_info().unwrap();
        assert_eq!(info.sample_rate, 8000);
        assert_eq!(info.channels, 1);
    }

    #[test]
    fn verify_reset_replays() {
        let pcm = sine_pcm(8000);
        let file = encode_lossless(&pcm, 8000, 1, 16, 3, None).unwrap();

        let mut stream = StreamingDecoder::new();
        stream.feed(&file);

        let first = stream.decode_available().unwrap();
        stream.reset();
        let second = stream.decode_available().unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn verify_bad_magic_is_terminal() {
        let mut stream = StreamingDecoder::new();
        stream.feed(&[0u8; 128]);
        assert!(stream.next_frame().is_err());
    }
}
