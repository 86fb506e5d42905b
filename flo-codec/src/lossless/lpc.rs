// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `lpc` module provides the analysis half of the adaptive linear predictive coder:
//! autocorrelation, the Levinson-Durbin recursion, and coefficient quantization.

/// The largest predictor order the format supports.
pub const MAX_ORDER: usize = 12;

/// The number of fractional bits a quantized coefficient may carry.
const MAX_SHIFT: u32 = 15;

/// Quantized prediction coefficients for one candidate order.
#[derive(Debug, Clone)]
pub struct QuantizedPredictor {
    /// Coefficients in application order: `coeffs[0]` multiplies the most recent sample.
    pub coeffs: Vec<i32>,
    pub shift: u32,
}

impl QuantizedPredictor {
    /// Predicts the sample at `pos` from the preceding samples.
    ///
    /// Warm-up positions (before a full filter history exists) predict from a zero state, so
    /// the first `coeffs.len()` residuals are the samples themselves. The encoder and decoder
    /// both rely on this convention.
    #[inline(always)]
    pub fn predict(&self, samples: &[i32], pos: usize) -> i64 {
        if pos < self.coeffs.len() {
            return 0;
        }

        let mut accum = 0i64;
        for (i, &coeff) in self.coeffs.iter().enumerate() {
            accum += i64::from(coeff) * i64::from(samples[pos - 1 - i]);
        }

        accum >> self.shift
    }
}

/// Computes the autocorrelation of `samples` at lags `0..=max_lag`.
pub fn autocorrelate(samples: &[i32], max_lag: usize) -> Vec<f64> {
    let mut autoc = vec![0.0f64; max_lag + 1];

    for (lag, r) in autoc.iter_mut().enumerate() {
        let mut sum = 0.0f64;
        for i in lag..samples.len() {
            sum += f64::from(samples[i]) * f64::from(samples[i - lag]);
        }
        *r = sum;
    }

    autoc
}

/// Runs the Levinson-Durbin recursion over the autocorrelation sequence, producing prediction
/// coefficients for every order from 1 up to `max_order`.
///
/// Returns one coefficient vector per order. If the recursion becomes unstable at some step (a
/// non-finite intermediate, or a reflection coefficient of magnitude >= 1), the result is
/// truncated to the last stable order; the caller's candidate search simply sees fewer orders.
pub fn levinson(autoc: &[f64], max_order: usize) -> Vec<Vec<f64>> {
    debug_assert!(autoc.len() > max_order);

    let mut orders: Vec<Vec<f64>> = Vec::with_capacity(max_order);

    let mut err = autoc[0];
    if err <= 0.0 || !err.is_finite() {
        // Degenerate input (all-zero or non-finite); no order is usable.
        return orders;
    }

    let mut coeffs = vec![0.0f64; max_order];

    for m in 0..max_order {
        let mut acc = autoc[m + 1];
        for i in 0..m {
            acc -= coeffs[i] * autoc[m - i];
        }

        let reflect = acc / err;

        if !reflect.is_finite() || reflect.abs() >= 1.0 {
            break;
        }

        coeffs[m] = reflect;
        for i in 0..m / 2 {
            let tmp = coeffs[i];
            coeffs[i] = tmp - reflect * coeffs[m - 1 - i];
            coeffs[m - 1 - i] -= reflect * tmp;
        }
        if m % 2 == 1 {
            coeffs[m / 2] -= reflect * coeffs[m / 2];
        }

        err *= 1.0 - reflect * reflect;
        if err <= 0.0 || !err.is_finite() {
            break;
        }

        orders.push(coeffs[..=m].to_vec());
    }

    orders
}

/// Quantizes floating-point predictor coefficients to i32 with a shared right-shift.
///
/// The shift is chosen so the largest coefficient magnitude still fits 15 fractional bits.
pub fn quantize_coeffs(coeffs: &[f64]) -> QuantizedPredictor {
    let max_abs = coeffs.iter().fold(0.0f64, |max, &c| max.max(c.abs()));

    let mut shift = MAX_SHIFT;
    if max_abs >= 1.0 {
        // Leave headroom for the integer part of the largest coefficient.
        let int_bits = (max_abs.log2().floor() as u32) + 1;
        shift = MAX_SHIFT.saturating_sub(int_bits);
    }

    let scale = f64::from(1u32 << shift);
    let quantized = coeffs
        .iter()
        .map(|&c| {
            (c * scale).round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
        })
        .collect();

    QuantizedPredictor { coeffs: quantized, shift }
}
