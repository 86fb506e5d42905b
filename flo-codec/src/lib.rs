// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The flo audio codecs.
//!
//! Two compression families share one container: a lossless predictive coder (`lossless`) and
//! a perceptual transform coder (`lossy`). The `frame` module dispatches between them per
//! one-second frame, `encoder` and `decoder` compose the frame codec over whole files, and
//! `streaming` decodes incrementally as bytes arrive.
//!
//! The free functions re-exported at the crate root are the public surface:
//!
//! ```no_run
//! use flo_codec::{decode, encode_lossless};
//!
//! # fn main() -> flo_core::errors::Result<()> {
//! let pcm = vec![0.0f32; 44100];
//! let file = encode_lossless(&pcm, 44100, 1, 16, 5, None)?;
//! let audio = decode(&file)?;
//! assert_eq!(audio.total_samples, 44100);
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod lossless;
pub mod lossy;
pub mod quality;
pub mod streaming;

pub use decoder::{decode, info, validate, DecodedAudio, FileInfo};
pub use encoder::{encode_lossless, encode_lossy, encode_with_bitrate};
pub use quality::{quality_for_bitrate, QualityPreset};
pub use streaming::{StreamInfo, StreamingDecoder};
