// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flo is a container-and-compressor for PCM audio with two compression families in one
//! format: a lossless predictive coder and a lossy perceptual transform coder. Files are
//! self-describing, seekable by a table of contents, integrity-checked by CRC32, and carry
//! structured MessagePack metadata apart from the audio payload, so metadata edits never
//! re-encode audio.
//!
//! This crate is a facade: it re-exports the member crates under stable paths and surfaces
//! the whole public operation set from the root.
//!
//! ```no_run
//! use flo::{decode, encode_lossless, read_metadata, validate};
//!
//! # fn main() -> flo::core::errors::Result<()> {
//! let pcm = vec![0.0f32; 44100];
//! let file = encode_lossless(&pcm, 44100, 1, 16, 5, None)?;
//!
//! assert!(validate(&file)?);
//! assert!(read_metadata(&file)?.is_empty());
//!
//! let audio = decode(&file)?;
//! assert_eq!(audio.total_samples, 44100);
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use flo_codec as codec;
pub use flo_core as core;
pub use flo_format as format;

pub use flo_codec::{
    decode, encode_lossless, encode_lossy, encode_with_bitrate, info, quality_for_bitrate,
    validate, DecodedAudio, FileInfo, QualityPreset, StreamInfo, StreamingDecoder,
};

pub use flo_format::meta::{
    has_metadata, read_metadata, strip_metadata, update_metadata, MetadataRecord,
};
