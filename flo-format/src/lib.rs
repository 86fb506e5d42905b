// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The flo container format.
//!
//! A flo file is laid out as `magic | header | TOC | DATA | EXTRA | META`. This crate provides
//! the typed records for each of those pieces, a borrowing reader that splits a byte slice into
//! them, a deterministic writer that assembles them back, and the MessagePack metadata surface
//! over the META chunk.
//!
//! Nothing in this crate encodes or decodes audio; the DATA chunk is opaque bytes here. The
//! codecs in `flo-codec` layer on top.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod container;
pub mod frame;
pub mod header;
pub mod meta;
pub mod toc;

pub use container::{write_container, ContainerRef};
pub use header::{FileHeader, FLO_MAGIC};
pub use toc::TocEntry;
