// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `lossless` module implements the adaptive linear predictive coder (ALPC).
//!
//! Each channel of a frame is predicted by the best filter of order 1-12, the prediction error
//! is entropy coded, and the decoder mirrors the recursion exactly in integer arithmetic, so
//! reconstruction is bit-perfect.

pub mod lpc;
pub mod residual;

use log::trace;

use flo_core::errors::{bitstream_error, Result};
use flo_core::io::{ByteReader, ByteWriter};

use flo_format::frame::ResidualEncoding;

use lpc::{autocorrelate, levinson, quantize_coeffs, QuantizedPredictor, MAX_ORDER};
use residual::{decode_residuals, encode_residuals, select_code, ResidualCode};

/// An encoded ALPC channel payload together with its selected order.
pub struct EncodedChannel {
    pub order: u8,
    pub payload: Vec<u8>,
}

/// The maximum predictor order searched for a given compression level (0-9).
pub fn search_order(level: u8) -> usize {
    let order = if level <= 5 { 3 + usize::from(level) } else { 8 + usize::from(level - 5) };
    order.min(MAX_ORDER)
}

fn compute_residuals(predictor: &QuantizedPredictor, samples: &[i32]) -> Option<Vec<i32>> {
    let mut residuals = Vec::with_capacity(samples.len());

    for i in 0..samples.len() {
        let r = i64::from(samples[i]) - predictor.predict(samples, i);
        if r < i64::from(i32::MIN) || r > i64::from(i32::MAX) {
            // A wildly mispredicting candidate; discard it rather than widen the residual.
            return None;
        }
        residuals.push(r as i32);
    }

    Some(residuals)
}

/// Encodes one channel of quantized samples, searching predictor orders up to `max_order`.
///
/// Returns the winning payload and its order. `estimated_bits` out-competes candidates within
/// the search; the caller compares the final cost against the raw PCM fallback.
pub fn encode_channel(samples: &[i32], bit_depth: u32, max_order: usize) -> EncodedChannel {
    let autoc = autocorrelate(samples, max_order);
    let orders = levinson(&autoc, max_order);

    let mut best: Option<(QuantizedPredictor, Vec<i32>, ResidualCode, u64)> = None;

    // The zero-coefficient predictor always exists: its residuals are the samples themselves.
    // It carries degenerate input (an all-zero channel in an otherwise active frame) and is the
    // baseline every real candidate must beat.
    for coeffs in std::iter::once(vec![0.0f64]).chain(orders) {
        let predictor = quantize_coeffs(&coeffs);

        let Some(residuals) = compute_residuals(&predictor, samples) else {
            continue;
        };

        let (code, residual_bits) = select_code(&residuals, bit_depth);

        // Coefficient block, shift, encoding tag, and parameter overhead.
        let param_bits = match code {
            ResidualCode::Rice { .. } => 8,
            ResidualCode::Golomb { .. } => 16,
            ResidualCode::Raw => 0,
        };
        let cost = 8 + 32 * predictor.coeffs.len() as u64 + 8 + 8 + param_bits + residual_bits;

        if best.as_ref().map_or(true, |(_, _, _, best_cost)| cost < *best_cost) {
            best = Some((predictor, residuals, code, cost));
        }
    }

    // The fallback candidate can never be discarded, so best is always present.
    let (predictor, residuals, code, cost) = best.unwrap();

    trace!(
        "alpc channel: order={}, shift={}, code={:?}, bits={}",
        predictor.coeffs.len(),
        predictor.shift,
        code,
        cost
    );

    let mut writer = ByteWriter::new();
    writer.write_u8(predictor.coeffs.len() as u8);
    for &coeff in &predictor.coeffs {
        writer.write_i32(coeff);
    }
    writer.write_u8(predictor.shift as u8);
    writer.write_u8(code.encoding().tag());
    match code {
        ResidualCode::Rice { k } => writer.write_u8(k),
        ResidualCode::Golomb { m } => writer.write_u16(m),
        ResidualCode::Raw => (),
    }
    writer.write_buf_bytes(&encode_residuals(&residuals, code, bit_depth));

    EncodedChannel { order: predictor.coeffs.len() as u8, payload: writer.into_bytes() }
}

/// Decodes one ALPC channel payload into `frame_samples` integer samples.
pub fn decode_channel(
    payload: &[u8],
    bit_depth: u32,
    frame_samples: usize,
    out: &mut Vec<i32>,
) -> Result<()> {
    let mut reader = ByteReader::new(payload);

    let coeff_count = usize::from(reader.read_u8()?);
    if coeff_count == 0 || coeff_count > MAX_ORDER {
        return bitstream_error("predictor order out of range");
    }

    let mut coeffs = Vec::with_capacity(coeff_count);
    for _ in 0..coeff_count {
        coeffs.push(reader.read_i32()?);
    }

    let shift = u32::from(reader.read_u8()?);
    if shift > 31 {
        return bitstream_error("coefficient shift out of range");
    }

    let code = match ResidualEncoding::from_tag(reader.read_u8()?)? {
        ResidualEncoding::Rice => ResidualCode::Rice { k: reader.read_u8()? },
        ResidualEncoding::Golomb => ResidualCode::Golomb { m: reader.read_u16()? },
        ResidualEncoding::Raw => ResidualCode::Raw,
    };

    let mut residuals = Vec::new();
    decode_residuals(reader.remaining_buf_bytes_ref(), code, bit_depth, frame_samples, &mut residuals)?;

    let predictor = QuantizedPredictor { coeffs, shift };

    out.clear();
    out.reserve(frame_samples);

    for (i, &r) in residuals.iter().enumerate() {
        let sample = i64::from(r) + predictor.predict(out, i);
        out.push(sample as i32);
    }

    Ok(())
}
