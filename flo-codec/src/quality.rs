// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `quality` module provides the quality presets and the bitrate translation helper.

/// The named quality presets of the lossy coder. The preset index (0-4) is what the header's
/// quality-level flag bits carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityPreset {
    Low,
    Medium,
    High,
    VeryHigh,
    Transparent,
}

impl QualityPreset {
    /// The quality parameter this preset maps to.
    pub fn quality(&self) -> f32 {
        match *self {
            QualityPreset::Low => 0.10,
            QualityPreset::Medium => 0.30,
            QualityPreset::High => 0.55,
            QualityPreset::VeryHigh => 0.75,
            QualityPreset::Transparent => 0.95,
        }
    }

    pub fn level(&self) -> u8 {
        match *self {
            QualityPreset::Low => 0,
            QualityPreset::Medium => 1,
            QualityPreset::High => 2,
            QualityPreset::VeryHigh => 3,
            QualityPreset::Transparent => 4,
        }
    }

    pub fn from_level(level: u8) -> Option<QualityPreset> {
        match level {
            0 => Some(QualityPreset::Low),
            1 => Some(QualityPreset::Medium),
            2 => Some(QualityPreset::High),
            3 => Some(QualityPreset::VeryHigh),
            4 => Some(QualityPreset::Transparent),
            _ => None,
        }
    }

    /// The preset whose quality is closest to an arbitrary quality parameter.
    pub fn nearest(quality: f32) -> QualityPreset {
        let presets = [
            QualityPreset::Low,
            QualityPreset::Medium,
            QualityPreset::High,
            QualityPreset::VeryHigh,
            QualityPreset::Transparent,
        ];

        let mut best = QualityPreset::Low;
        let mut best_dist = f32::INFINITY;
        for preset in presets {
            let dist = (preset.quality() - quality).abs();
            if dist < best_dist {
                best_dist = dist;
                best = preset;
            }
        }
        best
    }
}

/// Translates a target bitrate into a quality parameter.
///
/// The denominator is the bitrate of raw 16-bit PCM at the given sample rate and channel
/// count, so the ratio is the fraction of the uncompressed rate the caller is asking for.
pub fn quality_for_bitrate(bitrate_kbps: u32, sample_rate: u32, channels: u8) -> f32 {
    let raw_bits = f64::from(sample_rate) * f64::from(channels) * 16.0;
    let quality = 0.1 + 0.85 * (f64::from(bitrate_kbps) * 1000.0) / raw_bits;
    quality.clamp(0.05, 0.99) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_preset_levels_round_trip() {
        for level in 0..=4 {
            let preset = QualityPreset::from_level(level).unwrap();
            assert_eq!(preset.level(), level);
            assert_eq!(QualityPreset::nearest(preset.quality()), preset);
        }
        assert!(QualityPreset::from_level(5).is_none());
    }

    #[test]
    fn verify_bitrate_translation() {
        // 128 kbps stereo at 44.1 kHz sits in the middle of the range.
        let q = quality_for_bitrate(128, 44100, 2);
        assert!(q > 0.1 && q < 0.3);

        // Absurd targets clamp.
        assert_eq!(quality_for_bitrate(0, 44100, 2), 0.1);
        assert_eq!(quality_for_bitrate(10000, 44100, 2), 0.99);

        // More channels at the same bitrate means lower quality.
        assert!(quality_for_bitrate(128, 44100, 2) < quality_for_bitrate(128, 44100, 1));
    }
}
