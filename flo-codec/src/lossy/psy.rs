// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `psy` module implements the psychoacoustic model of the transform coder.
//!
//! MDCT coefficients are grouped into 25 critical bands on the Bark scale. Each band's masking
//! threshold is the maximum of the absolute threshold of hearing and the spread band energy
//! scaled by a tonality factor, and the per-band quantizer step is the square root of that
//! threshold divided by the global quality quantizer.

use flo_format::frame::BlockKind;

/// The number of critical bands.
pub const NUM_BANDS: usize = 25;

/// Slope of the masking spread towards higher bands, as a linear energy ratio per Bark.
const SPREAD_HI: f64 = 0.031_622_776_601_683_79; // -15 dB
/// Slope of the masking spread towards lower bands.
const SPREAD_LO: f64 = 0.003_162_277_660_168_379; // -25 dB

/// Bounds on the tonality factor derived from spectral flatness.
const TONALITY_MIN: f64 = 3.0e-5;

/// The Bark value of a frequency in Hertz.
fn bark(freq: f64) -> f64 {
    13.0 * (0.00076 * freq).atan() + 3.5 * ((freq / 7500.0) * (freq / 7500.0)).atan()
}

/// The absolute threshold of hearing at a frequency, in dB SPL, with full scale taken as
/// 96 dB SPL.
fn ath_db(freq: f64) -> f64 {
    let f = (freq.max(20.0)) / 1000.0;
    3.64 * f.powf(-0.8) - 6.5 * (-0.6 * (f - 3.3) * (f - 3.3)).exp() + 1.0e-3 * f.powi(4)
}

/// Maps each coefficient bin of an N-coefficient spectrum to its critical band.
pub struct BandMap {
    /// `edges[b]..edges[b + 1]` is the bin range of band b. Bands may be empty at low sample
    /// rates.
    edges: [usize; NUM_BANDS + 1],
    /// Absolute threshold of hearing per band, in the raw coefficient energy domain.
    ath: [f64; NUM_BANDS],
}

impl BandMap {
    pub fn new(sample_rate: u32, n_coeffs: usize) -> BandMap {
        let bin_hz = f64::from(sample_rate) / (2.0 * n_coeffs as f64);

        let mut edges = [n_coeffs; NUM_BANDS + 1];
        edges[0] = 0;

        let mut band = 0usize;
        for bin in 0..n_coeffs {
            let freq = (bin as f64 + 0.5) * bin_hz;
            let bin_band = (bark(freq) as usize).min(NUM_BANDS - 1);

            while band < bin_band {
                band += 1;
                edges[band] = bin;
            }
        }
        while band < NUM_BANDS {
            band += 1;
            edges[band] = n_coeffs;
        }

        // Full scale (96 dB SPL) corresponds to a raw per-coefficient energy of (N/2)^2.
        let full_scale = (n_coeffs as f64 / 2.0) * (n_coeffs as f64 / 2.0);

        let mut ath = [0.0f64; NUM_BANDS];
        for (b, threshold) in ath.iter_mut().enumerate() {
            let lo = edges[b];
            let hi = edges[b + 1];

            // The most sensitive frequency within the band bounds the whole band.
            let mut min_db = f64::INFINITY;
            for bin in lo..hi {
                let freq = (bin as f64 + 0.5) * bin_hz;
                min_db = min_db.min(ath_db(freq));
            }

            *threshold = if min_db.is_finite() {
                full_scale * 10.0f64.powf((min_db - 96.0) / 10.0)
            }
            else {
                0.0
            };
        }

        BandMap { edges, ath }
    }

    #[inline(always)]
    pub fn band_range(&self, band: usize) -> std::ops::Range<usize> {
        self.edges[band]..self.edges[band + 1]
    }
}

/// The global quantizer derived from the quality parameter. Larger values quantize finer.
pub fn quantizer_scale(quality: f32) -> f64 {
    let q = f64::from(quality).clamp(0.0, 1.0);

    // Piecewise log-linear: a gentle ramp through the low and middle qualities, then a steep
    // climb to transparency.
    let ln_q = if q <= 0.6 { -2.82 + 2.2 * q } else { -1.5 + 12.0 * (q - 0.6) };
    ln_q.exp()
}

/// Encodes a quantizer step into its u16 log-domain wire form.
pub fn sf_encode(step: f64) -> u16 {
    let log = step.max(1.0e-300).log2() * 256.0 + 32768.0;
    log.round().clamp(0.0, 65535.0) as u16
}

/// Decodes a u16 log-domain scale factor back into a quantizer step.
pub fn sf_decode(word: u16) -> f32 {
    ((f64::from(word) - 32768.0) / 256.0).exp2() as f32
}

/// Computes the per-band quantizer steps for one block of MDCT coefficients.
///
/// Returns the wire-form scale factors. Quantization must use the decoded form of these words,
/// never the unrounded step, so the encoder and decoder agree exactly.
pub fn compute_scale_factors(
    coeffs: &[f32],
    bands: &BandMap,
    quality: f32,
) -> [u16; NUM_BANDS] {
    let q = quantizer_scale(quality);

    // Band mean energies.
    let mut mean = [0.0f64; NUM_BANDS];
    for (b, m) in mean.iter_mut().enumerate() {
        let range = bands.band_range(b);
        if !range.is_empty() {
            let n = range.len() as f64;
            let sum: f64 =
                coeffs[range].iter().map(|&c| f64::from(c) * f64::from(c)).sum();
            *m = sum / n;
        }
    }

    // Tonality from global spectral flatness: a flat (noisy) spectrum masks itself well and
    // tolerates coarse steps, a peaky (tonal) one does not.
    let n = coeffs.len() as f64;
    let floor = 1.0e-20 + 1.0e-9 * mean.iter().sum::<f64>() / NUM_BANDS as f64;
    let log_sum: f64 =
        coeffs.iter().map(|&c| (f64::from(c) * f64::from(c) + floor).ln()).sum();
    let arith = coeffs.iter().map(|&c| f64::from(c) * f64::from(c)).sum::<f64>() / n + floor;
    let flatness = ((log_sum / n).exp() / arith).clamp(TONALITY_MIN, 1.0);

    // Two-sided exponential spreading of the band energies.
    let mut spread = [0.0f64; NUM_BANDS];
    let mut run = 0.0f64;
    for (b, s) in spread.iter_mut().enumerate() {
        run = mean[b].max(run * SPREAD_HI);
        *s = run;
    }
    run = 0.0;
    for (b, s) in spread.iter_mut().enumerate().rev() {
        run = mean[b].max(run * SPREAD_LO);
        *s = s.max(run);
    }

    let mut sfs = [0u16; NUM_BANDS];
    for (b, sf) in sfs.iter_mut().enumerate() {
        let threshold = bands.ath[b].max(spread[b] * flatness);
        let step = threshold.sqrt() / q;
        *sf = sf_encode(step.max(1.0e-10));
    }

    sfs
}

/// Convenience constructor pair: band maps for the two block widths at a sample rate.
pub struct BandMaps {
    long: BandMap,
    short: BandMap,
}

impl BandMaps {
    pub fn new(sample_rate: u32) -> BandMaps {
        BandMaps {
            long: BandMap::new(sample_rate, super::window::LONG_SIZE / 2),
            short: BandMap::new(sample_rate, super::window::SHORT_SIZE / 2),
        }
    }

    pub fn for_kind(&self, kind: BlockKind) -> &BandMap {
        match kind {
            BlockKind::Short => &self.short,
            _ => &self.long,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_band_map_partition() {
        for rate in [8000u32, 44100, 48000, 192000] {
            let map = BandMap::new(rate, 1024);

            assert_eq!(map.edges[0], 0);
            assert_eq!(map.edges[NUM_BANDS], 1024);
            for b in 0..NUM_BANDS {
                assert!(map.edges[b] <= map.edges[b + 1]);
            }
        }
    }

    #[test]
    fn verify_sf_round_trip_monotone() {
        let mut prev = 0.0f32;
        for word in (0..=65535u16).step_by(997) {
            let step = sf_decode(word);
            assert!(step > prev || word == 0);
            prev = step;

            // Re-encoding the decoded value is the identity.
            assert_eq!(sf_encode(f64::from(step)), word);
        }
    }

    #[test]
    fn verify_quantizer_scale_monotone() {
        let qualities = [0.05f32, 0.10, 0.30, 0.55, 0.75, 0.95, 0.99];
        for pair in qualities.windows(2) {
            assert!(quantizer_scale(pair[0]) < quantizer_scale(pair[1]));
        }
    }

    #[test]
    fn verify_tonal_spectrum_gets_finer_steps() {
        let bands = BandMap::new(44100, 1024);

        // A tonal spectrum: all energy in a few bins.
        let mut tonal = vec![0.0f32; 1024];
        tonal[40] = 500.0;
        tonal[41] = 300.0;

        // A noisy spectrum with the same total energy spread everywhere.
        let total = (500.0f64 * 500.0 + 300.0 * 300.0).sqrt();
        let noisy = vec![(total / 32.0) as f32; 1024];

        let sf_tonal = compute_scale_factors(&tonal, &bands, 0.55);
        let sf_noisy = compute_scale_factors(&noisy, &bands, 0.55);

        // In the tone's own band, the tonal signal demands a finer step than the noise
        // demands in the same band.
        let band = 40;
        let b = (0..NUM_BANDS).find(|&b| bands.band_range(b).contains(&band)).unwrap();
        assert!(sf_decode(sf_tonal[b]) < sf_decode(sf_noisy[b]));
    }
}
