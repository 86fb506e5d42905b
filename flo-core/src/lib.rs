// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared primitives for the flo audio codec.
//!
//! `flo-core` contains the pieces every other flo crate builds on: the common error type,
//! byte- and bit-oriented readers and writers, the CRC32 used for DATA chunk integrity, the
//! MDCT pair used by the lossy transform path, and sample-domain conversions. It contains no
//! knowledge of the container layout or of either codec.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod checksum;
pub mod dsp;
pub mod errors;
pub mod io;
pub mod sample;
pub mod util;
