// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `residual` module provides the entropy coding layer of the lossless path: Rice coding,
//! fixed-width Golomb coding, and a raw fallback, together with parameter selection.
//!
//! Signed residuals are zig-zag folded onto the non-negative integers first. Rice and Golomb
//! streams pack least-significant-bit first; the raw fallback packs sign-extended integers
//! most-significant-bit first at the declared bit depth.

use flo_core::errors::{bitstream_error, Result};
use flo_core::io::bit::{BitReaderLtr, BitReaderRtl, BitWriterLtr, BitWriterRtl};
use flo_core::util::bits::{sign_extend_leq32_to_i32, zigzag_fold, zigzag_unfold};

use flo_format::frame::ResidualEncoding;

/// The chosen residual encoding with its parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidualCode {
    Rice { k: u8 },
    /// Golomb with an arbitrary modulus. The remainder is stored fixed-width at
    /// ceil(log2(m)) bits.
    Golomb { m: u16 },
    /// Sign-extended integers at the declared bit depth.
    Raw,
}

impl ResidualCode {
    pub fn encoding(&self) -> ResidualEncoding {
        match *self {
            ResidualCode::Rice { .. } => ResidualEncoding::Rice,
            ResidualCode::Golomb { .. } => ResidualEncoding::Golomb,
            ResidualCode::Raw => ResidualEncoding::Raw,
        }
    }
}

#[inline(always)]
fn golomb_remainder_bits(m: u16) -> u32 {
    debug_assert!(m >= 1);
    // ceil(log2(m)); a modulus of 1 stores no remainder.
    16 - u32::from(m - 1).leading_zeros().saturating_sub(16)
}

/// Exact size in bits of a Rice-coded stream with parameter `k`.
fn rice_cost(folded: &[u32], k: u32) -> u64 {
    folded.iter().map(|&n| u64::from(n >> k) + 1 + u64::from(k)).sum()
}

/// Exact size in bits of a fixed-width Golomb stream with modulus `m`.
fn golomb_cost(folded: &[u32], m: u16) -> u64 {
    let rem_bits = u64::from(golomb_remainder_bits(m));
    folded.iter().map(|&n| u64::from(n / u32::from(m)) + 1 + rem_bits).sum()
}

/// Selects the cheapest residual code for the given residuals.
///
/// The Rice parameter starts from the log of the mean folded magnitude and is refined one step
/// in each direction by exact cost. A Golomb modulus fitted to the mean competes with it for
/// heavy-tailed residuals, and the raw fallback wins when the residuals are incompressible
/// (provided every residual fits the declared bit depth).
pub fn select_code(residuals: &[i32], bit_depth: u32) -> (ResidualCode, u64) {
    let folded: Vec<u32> = residuals.iter().map(|&r| zigzag_fold(r)).collect();

    let mean = folded.iter().map(|&n| u64::from(n)).sum::<u64>() / folded.len().max(1) as u64;

    let k0 = if mean == 0 { 0 } else { 63 - mean.leading_zeros() };

    let mut best_k = 0u32;
    let mut best_rice = u64::MAX;
    for k in k0.saturating_sub(1)..=(k0 + 1).min(30) {
        let cost = rice_cost(&folded, k);
        if cost < best_rice {
            best_rice = cost;
            best_k = k;
        }
    }

    let mut best = (ResidualCode::Rice { k: best_k as u8 }, best_rice);

    // A single outlier makes the Rice quotient explode; a Golomb modulus near 0.69x the mean is
    // the textbook fit for geometric residuals.
    let m = ((mean as f64 * 0.6931).round() as u64).clamp(1, u64::from(u16::MAX)) as u16;
    let cost = golomb_cost(&folded, m);
    if cost < best.1 {
        best = (ResidualCode::Golomb { m }, cost);
    }

    let max_abs_fits = residuals.iter().all(|&r| {
        i64::from(r) >= -(1i64 << (bit_depth - 1)) && i64::from(r) < (1i64 << (bit_depth - 1))
    });

    if max_abs_fits {
        let cost = residuals.len() as u64 * u64::from(bit_depth);
        if cost < best.1 {
            best = (ResidualCode::Raw, cost);
        }
    }

    best
}

/// Encodes `residuals` with the given code, returning the byte-padded stream.
pub fn encode_residuals(residuals: &[i32], code: ResidualCode, bit_depth: u32) -> Vec<u8> {
    match code {
        ResidualCode::Rice { k } => {
            let mut bw = BitWriterRtl::new();
            for &r in residuals {
                let n = zigzag_fold(r);
                bw.write_unary_ones(n >> k);
                bw.write_bits_leq32(n, u32::from(k));
            }
            bw.into_bytes()
        }
        ResidualCode::Golomb { m } => {
            let rem_bits = golomb_remainder_bits(m);
            let mut bw = BitWriterRtl::new();
            for &r in residuals {
                let n = zigzag_fold(r);
                bw.write_unary_ones(n / u32::from(m));
                bw.write_bits_leq32(n % u32::from(m), rem_bits);
            }
            bw.into_bytes()
        }
        ResidualCode::Raw => {
            let mut bw = BitWriterLtr::new();
            for &r in residuals {
                bw.write_bits_leq32(r as u32, bit_depth);
            }
            bw.into_bytes()
        }
    }
}

/// Decodes `count` residuals from a byte stream. The exact inverse of [`encode_residuals`].
pub fn decode_residuals(
    buf: &[u8],
    code: ResidualCode,
    bit_depth: u32,
    count: usize,
    out: &mut Vec<i32>,
) -> Result<()> {
    out.clear();
    out.reserve(count);

    match code {
        ResidualCode::Rice { k } => {
            if k > 30 {
                return bitstream_error("rice parameter out of range");
            }
            let mut bs = BitReaderRtl::new(buf);
            for _ in 0..count {
                let q = bs.read_unary_ones()?;
                let r = bs.read_bits_leq32(u32::from(k))?;
                out.push(zigzag_unfold((q << k) | r));
            }
        }
        ResidualCode::Golomb { m } => {
            if m == 0 {
                return bitstream_error("golomb modulus is zero");
            }
            let rem_bits = golomb_remainder_bits(m);
            let mut bs = BitReaderRtl::new(buf);
            for _ in 0..count {
                let q = bs.read_unary_ones()?;
                let r = bs.read_bits_leq32(rem_bits)?;
                if r >= u32::from(m) {
                    return bitstream_error("golomb remainder out of range");
                }
                let n = u64::from(q) * u64::from(m) + u64::from(r);
                out.push(zigzag_unfold(n as u32));
            }
        }
        ResidualCode::Raw => {
            let mut bs = BitReaderLtr::new(buf);
            for _ in 0..count {
                let value = bs.read_bits_leq32(bit_depth)?;
                out.push(sign_extend_leq32_to_i32(value, bit_depth));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(residuals: &[i32], code: ResidualCode, bit_depth: u32) {
        let buf = encode_residuals(residuals, code, bit_depth);

        let mut decoded = Vec::new();
        decode_residuals(&buf, code, bit_depth, residuals.len(), &mut decoded).unwrap();
        assert_eq!(decoded, residuals);
    }

    #[test]
    fn verify_rice_round_trip() {
        let residuals = [0, 1, -1, 5, -17, 100, -100, 4097, -3000, 0, 0, 2];
        for k in 0..12 {
            round_trip(&residuals, ResidualCode::Rice { k }, 16);
        }
    }

    #[test]
    fn verify_golomb_round_trip() {
        let residuals = [3, -2, 900, 0, -1, 7, 12, -45];
        for m in [1u16, 2, 3, 5, 10, 100, 1000] {
            round_trip(&residuals, ResidualCode::Golomb { m }, 16);
        }
    }

    #[test]
    fn verify_raw_round_trip() {
        round_trip(&[-32768, 32767, 0, -1, 1, 12345], ResidualCode::Raw, 16);
        round_trip(&[-(1 << 23), (1 << 23) - 1, -99, 99], ResidualCode::Raw, 24);
        round_trip(&[i32::MIN, i32::MAX, -7], ResidualCode::Raw, 32);
    }

    #[test]
    fn verify_select_code_small_residuals() {
        // Near-zero residuals must pick a small Rice parameter, never the raw fallback.
        let residuals: Vec<i32> = (0..1000).map(|i| (i % 5) - 2).collect();
        let (code, cost) = select_code(&residuals, 16);

        match code {
            ResidualCode::Rice { k } => assert!(k <= 3),
            other => panic!("expected rice, selected {:?}", other),
        }
        assert!(cost < 1000 * 16);
    }

    #[test]
    fn verify_select_code_incompressible() {
        // Residuals that span the whole sample range are cheapest stored raw.
        let residuals: Vec<i32> =
            (0..500i64).map(|i| (i * 2_654_435_761 % 65536 - 32768) as i32).collect();
        let (code, _) = select_code(&residuals, 16);
        assert_eq!(code, ResidualCode::Raw);
    }

    #[test]
    fn verify_truncated_stream_errors() {
        let buf = encode_residuals(&[1000, 2000, 3000], ResidualCode::Rice { k: 2 }, 16);

        let mut decoded = Vec::new();
        let result = decode_residuals(&buf, ResidualCode::Rice { k: 2 }, 16, 100, &mut decoded);
        assert!(result.is_err());
    }
}
