// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `window` module provides the analysis/synthesis windows and the block-lapping geometry
//! of the transform coder.
//!
//! All four window shapes are built from the same slope curve,
//! `sin(π/2 · sin²(π(t+½)/2L))` over a slope of width `L`. A long, start, or stop block is
//! 2048 samples wide; a short block is 256. Start and stop blocks place a long slope on one
//! side and a short slope on the other, padded with flat-one and zero regions positioned so
//! that the slopes of adjacent blocks coincide and their squares sum to one. Slopes are
//! centered on the quarter points of each block, which makes every legal transition
//! overlap-add perfectly.

use std::f64::consts;

use flo_format::frame::BlockKind;

/// The width of a long, start, or stop block.
pub const LONG_SIZE: usize = 2048;
/// The width of a short block.
pub const SHORT_SIZE: usize = 256;

/// The number of leading synthesis samples that reconstruct encoder priming rather than signal.
/// The decoder discards exactly this many finalized samples per channel at stream start.
pub const PRIMING_SAMPLES: usize = LONG_SIZE / 2;

/// The number of short blocks emitted between a start and a stop block.
pub const SHORT_RUN: usize = 8;

/// The rising slope value at position `t` of a slope of width `l`.
fn slope_up(t: usize, l: usize) -> f32 {
    let frac = consts::PI * (t as f64 + 0.5) / (2 * l) as f64;
    (consts::FRAC_PI_2 * frac.sin().powi(2)).sin() as f32
}

fn slope_down(t: usize, l: usize) -> f32 {
    slope_up(l - 1 - t, l)
}

fn generate_window(size: usize, left: usize, right: usize) -> Vec<f32> {
    let mut window = vec![0.0f32; size];

    // Slopes are centered on the quarter points.
    let l_start = size / 4 - left / 2;
    let r_start = 3 * size / 4 - right / 2;

    for (i, w) in window.iter_mut().enumerate() {
        *w = if i < l_start {
            0.0
        }
        else if i < l_start + left {
            slope_up(i - l_start, left)
        }
        else if i < r_start {
            1.0
        }
        else if i < r_start + right {
            slope_down(i - r_start, right)
        }
        else {
            0.0
        };
    }

    window
}

/// The four window shapes, built once per codec instance.
pub struct Windows {
    long: Vec<f32>,
    short: Vec<f32>,
    start: Vec<f32>,
    stop: Vec<f32>,
}

impl Windows {
    pub fn new() -> Windows {
        Windows {
            long: generate_window(LONG_SIZE, LONG_SIZE / 2, LONG_SIZE / 2),
            short: generate_window(SHORT_SIZE, SHORT_SIZE / 2, SHORT_SIZE / 2),
            start: generate_window(LONG_SIZE, LONG_SIZE / 2, SHORT_SIZE / 2),
            stop: generate_window(LONG_SIZE, SHORT_SIZE / 2, LONG_SIZE / 2),
        }
    }

    pub fn window(&self, kind: BlockKind) -> &[f32] {
        match kind {
            BlockKind::Long => &self.long,
            BlockKind::Short => &self.short,
            BlockKind::Start => &self.start,
            BlockKind::Stop => &self.stop,
        }
    }
}

impl Default for Windows {
    fn default() -> Self {
        Windows::new()
    }
}

/// The distance between the starts of two adjacent blocks on the sample timeline.
///
/// Negative for a short-to-stop transition: the stop block's zero region reaches back over the
/// preceding shorts.
pub fn advance(prev: BlockKind, cur: BlockKind) -> i64 {
    (3 * prev.block_size() / 4) as i64 - (cur.block_size() / 4) as i64
}

/// The offset from a block's start to its finalization point: everything before it can no
/// longer change, because the next legal block's window is zero there.
pub fn finalize_offset(kind: BlockKind) -> usize {
    let size = kind.block_size();
    let right = match kind {
        BlockKind::Long | BlockKind::Stop => size / 2,
        BlockKind::Start | BlockKind::Short => SHORT_SIZE / 2,
    };
    3 * size / 4 - right / 2
}
