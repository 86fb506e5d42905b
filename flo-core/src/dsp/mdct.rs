// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `mdct` module implements the Modified Discrete Cosine Transform (MDCT).
//!
//! The (I)MDCT pair in this module is not general purpose and is specialized for use in typical
//! audio compression applications: an N-point transform consumes 2N windowed time-domain samples
//! and produces N coefficients, and reconstruction relies on overlap-add of 50%-lapped blocks
//! whose windows satisfy the Princen-Bradley condition.
//!
//! Both directions are computed from the closed-form definition. The cosine arguments
//! `π/(4N) · (2j + 1 + N)(2k + 1)` only ever take values on the lattice `π·i/(4N)`, so a single
//! table of 8N cosines indexed modulo 8N covers every term exactly.

use std::f64;

fn build_table(n: usize) -> Vec<f64> {
    let c = f64::consts::PI / (4 * n) as f64;
    (0..8 * n).map(|i| (c * i as f64).cos()).collect()
}

/// An N-point forward Modified Discrete Cosine Transform.
pub struct Mdct {
    n: usize,
    table: Vec<f64>,
}

impl Mdct {
    /// Instantiate an N-point MDCT where `n` is the number of output coefficients.
    ///
    /// `n` must be a power of two no larger than 8192.
    pub fn new(n: usize) -> Mdct {
        assert!(n.is_power_of_two(), "point count must be a power of two");
        assert!(n <= 8192, "point count exceeds 8192");

        Mdct { n, table: build_table(n) }
    }

    /// Performs the forward transform of 2N windowed samples in `src` into N coefficients in
    /// `dst`. The slice lengths must match or an assertion is thrown.
    pub fn mdct(&self, src: &[f32], dst: &mut [f32]) {
        let n = self.n;

        assert_eq!(src.len(), 2 * n);
        assert_eq!(dst.len(), n);

        let period = 8 * n;

        for (k, coeff) in dst.iter_mut().enumerate() {
            let step = 2 * k + 1;

            let mut accum = 0.0f64;
            // The lattice index for j = 0, advancing by 2 * step per input sample.
            let mut idx = (n + 1) * step % period;

            for &s in src {
                accum += f64::from(s) * self.table[idx];
                idx = (idx + 2 * step) % period;
            }

            *coeff = accum as f32;
        }
    }
}

/// An N-point inverse Modified Discrete Cosine Transform (IMDCT).
pub struct Imdct {
    n: usize,
    table: Vec<f64>,
}

impl Imdct {
    /// Instantiate an N-point IMDCT where `n` is the number of input coefficients.
    ///
    /// `n` must be a power of two no larger than 8192.
    pub fn new(n: usize) -> Imdct {
        assert!(n.is_power_of_two(), "point count must be a power of two");
        assert!(n <= 8192, "point count exceeds 8192");

        Imdct { n, table: build_table(n) }
    }

    /// Performs the inverse transform of N coefficients in `src` into 2N time-domain samples in
    /// `dst`. The slice lengths must match or an assertion is thrown.
    ///
    /// This function performs no windowing. Each output carries the 2/N normalization so that
    /// windowed overlap-add of adjacent blocks reconstructs the original signal.
    pub fn imdct(&self, src: &[f32], dst: &mut [f32]) {
        let n = self.n;

        assert_eq!(src.len(), n);
        assert_eq!(dst.len(), 2 * n);

        let period = 8 * n;
        let scale = 2.0 / n as f64;

        for (j, out) in dst.iter_mut().enumerate() {
            let base = 2 * j + 1 + n;

            let mut accum = 0.0f64;
            // The lattice index for k = 0, advancing by 2 * base per coefficient.
            let mut idx = base % period;

            for &c in src {
                accum += f64::from(c) * self.table[idx];
                idx = (idx + 2 * base) % period;
            }

            *out = (scale * accum) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Imdct, Mdct};

    /// A sine window over 2N samples, satisfying the Princen-Bradley condition.
    fn sine_window(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (std::f64::consts::PI / len as f64 * (i as f64 + 0.5)).sin() as f32)
            .collect()
    }

    #[test]
    fn verify_tdac_reconstruction() {
        // Overlap-add of two adjacent windowed blocks must reconstruct the middle N samples.
        let n = 64;

        let mdct = Mdct::new(n);
        let imdct = Imdct::new(n);
        let window = sine_window(2 * n);

        // A deterministic, non-trivial signal.
        let signal: Vec<f32> =
            (0..3 * n).map(|i| ((i * i % 31) as f32 - 15.0) / 16.0).collect();

        let mut spectrum = vec![0.0f32; n];
        let mut block_a = vec![0.0f32; 2 * n];
        let mut block_b = vec![0.0f32; 2 * n];

        let windowed: Vec<f32> =
            signal[..2 * n].iter().zip(&window).map(|(&s, &w)| s * w).collect();
        mdct.mdct(&windowed, &mut spectrum);
        imdct.imdct(&spectrum, &mut block_a);

        let windowed: Vec<f32> =
            signal[n..3 * n].iter().zip(&window).map(|(&s, &w)| s * w).collect();
        mdct.mdct(&windowed, &mut spectrum);
        imdct.imdct(&spectrum, &mut block_b);

        for i in 0..n {
            let recon = block_a[n + i] * window[n + i] + block_b[i] * window[i];
            assert!((recon - signal[n + i]).abs() < 1e-4);
        }
    }

    #[test]
    fn verify_imdct_linearity() {
        let n = 32;
        let imdct = Imdct::new(n);

        let mut unit = vec![0.0f32; n];
        unit[3] = 1.0;

        let mut doubled = vec![0.0f32; n];
        doubled[3] = 2.0;

        let mut out_a = vec![0.0f32; 2 * n];
        let mut out_b = vec![0.0f32; 2 * n];

        imdct.imdct(&unit, &mut out_a);
        imdct.imdct(&doubled, &mut out_b);

        for (a, b) in out_a.iter().zip(&out_b) {
            assert!((2.0 * a - b).abs() < 1e-6);
        }
    }
}
