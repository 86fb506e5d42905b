// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `sample` module provides conversions between floating-point samples in [-1, 1] and the
//! integer domain the codecs operate in.

/// Quantizes a floating-point sample to a signed integer scaled by 2^(bit_depth - 1), clipped to
/// the representable range.
#[inline(always)]
pub fn quantize(sample: f32, bit_depth: u32) -> i32 {
    let scale = (1i64 << (bit_depth - 1)) as f64;
    let value = (f64::from(sample) * scale).round() as i64;
    value.clamp(-(scale as i64), scale as i64 - 1) as i32
}

/// Converts an integer-domain sample back to floating-point by dividing by 2^(bit_depth - 1).
#[inline(always)]
pub fn dequantize(value: i32, bit_depth: u32) -> f32 {
    let scale = (1i64 << (bit_depth - 1)) as f32;
    value as f32 / scale
}

/// Quantizes an entire slice in place of allocation performed by the caller.
pub fn quantize_buf(samples: &[f32], bit_depth: u32, out: &mut Vec<i32>) {
    out.clear();
    out.extend(samples.iter().map(|&s| quantize(s, bit_depth)));
}

#[cfg(test)]
mod tests {
    use super::{dequantize, quantize};

    #[test]
    fn verify_quantize_range() {
        assert_eq!(quantize(0.0, 16), 0);
        assert_eq!(quantize(1.0, 16), 32767);
        assert_eq!(quantize(-1.0, 16), -32768);
        assert_eq!(quantize(2.0, 16), 32767);
        assert_eq!(quantize(-2.0, 16), -32768);
        assert_eq!(quantize(0.5, 16), 16384);
    }

    #[test]
    fn verify_requantize_identity() {
        // Dequantizing and requantizing must be the identity for every in-range value at every
        // bit depth; the lossless round-trip guarantee depends on it.
        let cases: [(u32, &[i32]); 3] = [
            (16, &[0, 1, -1, 12345, -12345, 32767, -32768]),
            (24, &[0, 1, -1, 12345, 1 << 20, -(1 << 20), (1 << 23) - 1, -(1 << 23)]),
            (32, &[0, 1, -1, 12345, 1 << 20, -(1 << 20)]),
        ];

        for (bit_depth, values) in cases {
            for &value in values {
                let f = dequantize(value, bit_depth);
                assert_eq!(quantize(f, bit_depth), value, "depth {}", bit_depth);
            }
        }
    }
}
