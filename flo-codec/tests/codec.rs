// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use flo_codec::{
    decode, encode_lossless, encode_lossy, encode_with_bitrate, info, validate, QualityPreset,
    StreamingDecoder,
};
use flo_core::sample::{dequantize, quantize};
use flo_format::container::ContainerRef;
use flo_format::header::HEADER_SIZE;
use flo_format::meta::{
    has_metadata, keys, read_metadata, strip_metadata, update_metadata, MetadataRecord,
};

fn sine(len: usize, freq: f64, rate: f64, amplitude: f64) -> Vec<f32> {
    (0..len)
        .map(|i| (amplitude * (2.0 * std::f64::consts::PI * freq * i as f64 / rate).sin()) as f32)
        .collect()
}

fn sweep(len: usize, rate: f64, amplitude: f64) -> Vec<f32> {
    // 20 Hz to 20 kHz over the whole buffer.
    (0..len)
        .map(|i| {
            let t = i as f64 / rate;
            let duration = len as f64 / rate;
            let freq = 20.0 * (1000.0f64).powf(t / duration);
            let phase = 2.0 * std::f64::consts::PI * 20.0 * duration / (1000.0f64).ln()
                * ((1000.0f64).powf(t / duration) - 1.0);
            (amplitude * phase.sin()).max(-1.0).min(1.0) as f32
        })
        .collect()
}

fn noise(len: usize, amplitude: f32, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-amplitude..amplitude)).collect()
}

fn requantize(pcm: &[f32], bit_depth: u32) -> Vec<f32> {
    pcm.iter().map(|&s| dequantize(quantize(s, bit_depth), bit_depth)).collect()
}

fn psnr(reference: &[f32], decoded: &[f32]) -> f64 {
    assert_eq!(reference.len(), decoded.len());
    let mse = reference
        .iter()
        .zip(decoded)
        .map(|(&a, &b)| (f64::from(a) - f64::from(b)).powi(2))
        .sum::<f64>()
        / reference.len() as f64;
    10.0 * (1.0 / mse.max(1.0e-30)).log10()
}

// Scenario A: one second of digital silence.
#[test]
fn silence_file_is_tiny_and_exact() {
    let pcm = vec![0.0f32; 44100];
    let file = encode_lossless(&pcm, 44100, 1, 16, 5, None).unwrap();

    assert!(file.len() <= 200, "silence file is {} bytes", file.len());
    assert!(validate(&file).unwrap());

    let container = ContainerRef::parse(&file).unwrap();
    assert_eq!(container.toc.len(), 1);
    assert_eq!(container.data[0], 0, "expected a silence frame type tag");

    let audio = decode(&file).unwrap();
    assert_eq!(audio.total_samples, 44100);
    assert!(audio.pcm.iter().all(|&s| s == 0.0));
}

// Scenario B: a two second sine reconstructs exactly after requantization.
#[test]
fn lossless_sine_round_trip_exact() {
    let pcm = sine(2 * 44100, 440.0, 44100.0, 0.8);
    let file = encode_lossless(&pcm, 44100, 1, 16, 5, None).unwrap();

    let container = ContainerRef::parse(&file).unwrap();
    assert_eq!(container.toc.len(), 2);
    for entry in &container.toc {
        let tag = container.data[entry.byte_offset as usize];
        assert!((1..=12).contains(&tag), "expected alpc frames, got type {}", tag);
    }

    let audio = decode(&file).unwrap();
    assert_eq!(audio.pcm, requantize(&pcm, 16));

    // A predicted sine is far smaller than raw 16-bit PCM.
    assert!(file.len() < 2 * 44100 * 2 / 2);
}

// Scenario C: independent stereo sines, lossless and lossy.
#[test]
fn stereo_sines_lossless_exact() {
    let left = sine(48000, 440.0, 48000.0, 0.8);
    let right = sine(48000, 554.37, 48000.0, 0.8);

    let mut pcm = Vec::with_capacity(2 * 48000);
    for i in 0..48000 {
        pcm.push(left[i]);
        pcm.push(right[i]);
    }

    let file = encode_lossless(&pcm, 48000, 2, 16, 5, None).unwrap();
    let audio = decode(&file).unwrap();

    assert_eq!(audio.channels, 2);
    assert_eq!(audio.pcm, requantize(&pcm, 16));
}

#[test]
fn stereo_sines_lossy_high_quality() {
    let left = sine(48000, 440.0, 48000.0, 0.8);
    let right = sine(48000, 554.37, 48000.0, 0.8);

    let mut pcm = Vec::with_capacity(2 * 48000);
    for i in 0..48000 {
        pcm.push(left[i]);
        pcm.push(right[i]);
    }

    let file = encode_lossy(&pcm, 48000, 2, 16, QualityPreset::High.quality(), None).unwrap();
    let audio = decode(&file).unwrap();

    assert_eq!(audio.total_samples, 48000);

    let dec_left: Vec<f32> = audio.pcm.iter().step_by(2).copied().collect();
    let dec_right: Vec<f32> = audio.pcm.iter().skip(1).step_by(2).copied().collect();

    assert!(psnr(&left, &dec_left) >= 40.0);
    assert!(psnr(&right, &dec_right) >= 40.0);
}

// Scenario D: white noise under the lossy coder. The wire format stores one i16 per
// surviving coefficient of a critically sampled transform, which caps what ratio and PSNR
// can be achieved simultaneously on a flat spectrum; these are the locked bounds.
#[test]
fn lossy_noise_compresses() {
    let pcm = noise(3 * 44100, 0.5, 0x5eed);
    let file = encode_lossy(&pcm, 44100, 1, 16, QualityPreset::High.quality(), None).unwrap();

    let raw_size = pcm.len() * 2;
    let ratio = raw_size as f64 / file.len() as f64;
    assert!(ratio >= 2.0, "compression ratio {:.2}", ratio);

    let audio = decode(&file).unwrap();
    assert!(psnr(&pcm, &audio.pcm) >= 10.0);
}

// Scenario E: a metadata update must not touch a single DATA byte.
#[test]
fn metadata_update_leaves_audio_untouched() {
    let pcm = sweep(5 * 44100, 44100.0, 0.7);
    let file = encode_lossless(&pcm, 44100, 1, 16, 5, None).unwrap();

    let mut record = MetadataRecord::new();
    record.set_str(keys::TITLE, "Sweep");
    record.set_str(keys::ARTIST, "Test");
    record.set_u32(keys::BPM, 120);

    let updated = update_metadata(&file, &record).unwrap();

    let before = ContainerRef::parse(&file).unwrap();
    let after = ContainerRef::parse(&updated).unwrap();

    assert_eq!(before.data, after.data);
    assert_eq!(before.extra, after.extra);
    assert_eq!(before.header.data_crc32, after.header.data_crc32);
    assert_eq!(before.header.toc_size, after.header.toc_size);
    assert_ne!(before.header.meta_size, after.header.meta_size);

    assert_eq!(read_metadata(&updated).unwrap(), record);
    assert_eq!(decode(&updated).unwrap().pcm, decode(&file).unwrap().pcm);
    assert!(validate(&updated).unwrap());
}

// Scenario F: feeding the streaming decoder tiny chunks matches batch decode.
#[test]
fn streaming_in_seven_byte_chunks_matches_decode() {
    let left = sine(2 * 22050, 330.0, 22050.0, 0.6);
    let right = noise(2 * 22050, 0.3, 7);

    let mut pcm = Vec::new();
    for i in 0..2 * 22050 {
        pcm.push(left[i]);
        pcm.push(right[i]);
    }

    let file = encode_lossless(&pcm, 22050, 2, 16, 5, None).unwrap();
    let reference = decode(&file).unwrap();

    let mut stream = StreamingDecoder::new();
    let mut out = Vec::new();
    for chunk in file.chunks(7) {
        stream.feed(chunk);
        while let Some(frame) = stream.next_frame().unwrap() {
            out.extend_from_slice(&frame);
        }
    }

    assert_eq!(out, reference.pcm);
}

#[test]
fn streaming_lossy_matches_decode() {
    let pcm = sine(22050, 500.0, 22050.0, 0.7);
    let file = encode_lossy(&pcm, 22050, 1, 16, 0.75, None).unwrap();
    let reference = decode(&file).unwrap();

    let mut stream = StreamingDecoder::new();
    let mut out = Vec::new();
    for chunk in file.chunks(512) {
        stream.feed(chunk);
        out.extend_from_slice(&stream.decode_available().unwrap());
    }

    assert_eq!(out, reference.pcm);
}

// Property 1: lossless round trips bit-exactly for every bit depth, including on noise.
#[test]
fn lossless_noise_round_trip_all_depths() {
    let pcm = noise(22050, 0.95, 42);

    for bit_depth in [16u8, 24, 32] {
        let file = encode_lossless(&pcm, 22050, 1, bit_depth, 9, None).unwrap();
        let audio = decode(&file).unwrap();
        assert_eq!(audio.pcm, requantize(&pcm, u32::from(bit_depth)), "depth {}", bit_depth);
    }
}

// Properties 5 and 6: CRC validation and its sensitivity to DATA corruption.
#[test]
fn validate_detects_data_corruption() {
    let pcm = sine(16000, 440.0, 16000.0, 0.5);
    let mut file = encode_lossless(&pcm, 16000, 1, 16, 5, None).unwrap();

    assert!(validate(&file).unwrap());

    let container = ContainerRef::parse(&file).unwrap();
    let data_start = file.len()
        - container.meta.len()
        - container.extra.len()
        - container.data.len();

    // Flip one byte in the middle of DATA.
    let target = data_start + container.data.len() / 2;
    drop(container);
    file[target] ^= 0x01;

    assert!(!validate(&file).unwrap());
}

// Properties 7 and 8: header size invariant and exact TOC partition of DATA.
#[test]
fn container_structure_invariants() {
    let pcm = sine(3 * 16000 + 1234, 440.0, 16000.0, 0.5);

    for file in [
        encode_lossless(&pcm, 16000, 1, 16, 5, None).unwrap(),
        encode_lossy(&pcm, 16000, 1, 16, 0.5, None).unwrap(),
    ] {
        let container = ContainerRef::parse(&file).unwrap();
        let header = &container.header;

        let declared = 4
            + HEADER_SIZE
            + header.toc_size
            + header.data_size
            + header.extra_size
            + header.meta_size;
        assert_eq!(declared, file.len() as u64);

        // The final frame is shorter than a second; total_frames counts it.
        assert_eq!(header.total_frames, 4);
        assert_eq!(container.toc.len(), 4);

        let mut offset = 0u64;
        for (index, entry) in container.toc.iter().enumerate() {
            assert_eq!(entry.frame_index, index as u32);
            assert_eq!(entry.byte_offset, offset);
            assert_eq!(entry.timestamp_ms, index as u32 * 1000);
            offset += u64::from(entry.frame_size);
        }
        assert_eq!(offset, header.data_size);
    }
}

// Property 10: transparency on a tone.
#[test]
fn transparent_sine_psnr() {
    let pcm = sine(44100, 997.0, 44100.0, 0.5);
    let file =
        encode_lossy(&pcm, 44100, 1, 16, QualityPreset::Transparent.quality(), None).unwrap();

    let audio = decode(&file).unwrap();
    assert!(psnr(&pcm, &audio.pcm) >= 60.0);
}

// Property 11: file sizes order by quality preset.
#[test]
fn lossy_sizes_order_by_preset() {
    let mut pcm = sine(44100, 440.0, 44100.0, 0.4);
    let floor = noise(44100, 0.1, 99);
    for (s, n) in pcm.iter_mut().zip(&floor) {
        *s += n;
    }

    let presets = [
        QualityPreset::Low,
        QualityPreset::Medium,
        QualityPreset::High,
        QualityPreset::VeryHigh,
        QualityPreset::Transparent,
    ];

    let sizes: Vec<usize> = presets
        .iter()
        .map(|p| encode_lossy(&pcm, 44100, 1, 16, p.quality(), None).unwrap().len())
        .collect();

    for pair in sizes.windows(2) {
        assert!(pair[0] < pair[1], "sizes not monotone: {:?}", sizes);
    }
}

// Properties 2-4: metadata round trips through both encoders, and strip is idempotent.
#[test]
fn metadata_round_trips_through_encoders() {
    let pcm = sine(16000, 440.0, 16000.0, 0.5);

    let mut record = MetadataRecord::new();
    record.set_str(keys::TITLE, "Tone");
    record.set_u32(keys::BPM, 98);
    record.insert("x-vendor-blob", rmpv::Value::Binary(vec![1, 2, 3, 4]));

    let lossless = encode_lossless(&pcm, 16000, 1, 16, 5, Some(&record)).unwrap();
    let lossy = encode_lossy(&pcm, 16000, 1, 16, 0.3, Some(&record)).unwrap();

    for file in [&lossless, &lossy] {
        assert!(has_metadata(file).unwrap());
        assert_eq!(read_metadata(file).unwrap(), record);
    }

    let stripped = strip_metadata(&lossless).unwrap();
    assert!(!has_metadata(&stripped).unwrap());
    assert_eq!(stripped, strip_metadata(&stripped).unwrap());
    assert_eq!(decode(&stripped).unwrap().pcm, decode(&lossless).unwrap().pcm);
}

#[test]
fn info_reports_stream_parameters() {
    let pcm = sine(2 * 32000 + 5000, 440.0, 32000.0, 0.5);

    let file = encode_lossless(&pcm, 32000, 1, 16, 7, None).unwrap();
    let info = info(&file).unwrap();

    assert_eq!(info.sample_rate, 32000);
    assert_eq!(info.channels, 1);
    assert_eq!(info.bit_depth, 16);
    assert_eq!(info.total_samples, 2 * 32000 + 5000);
    assert!(!info.is_lossy);
    assert!(info.lossy_quality.is_none());
    assert!((info.duration_secs - 2.15625).abs() < 1.0e-9);
    assert!(info.compression_ratio > 1.0);
}

#[test]
fn info_reports_lossy_quality() {
    let pcm = sine(16000, 440.0, 16000.0, 0.5);
    let file = encode_lossy(&pcm, 16000, 1, 16, 0.52, None).unwrap();

    let info = info(&file).unwrap();
    assert!(info.is_lossy);
    // 0.52 is nearest the High preset.
    assert_eq!(info.lossy_quality, Some(QualityPreset::High.quality()));
}

#[test]
fn bitrate_encoding_tracks_target() {
    let pcm = noise(2 * 44100, 0.4, 11);

    let low = encode_with_bitrate(&pcm, 44100, 1, 16, 64, None).unwrap();
    let high = encode_with_bitrate(&pcm, 44100, 1, 16, 320, None).unwrap();

    assert!(low.len() < high.len());
}

#[test]
fn rejects_unsupported_parameters() {
    let pcm = vec![0.0f32; 1000];

    assert!(encode_lossless(&pcm, 4000, 1, 16, 5, None).is_err());
    assert!(encode_lossless(&pcm, 44100, 3, 16, 5, None).is_err());
    assert!(encode_lossless(&pcm, 44100, 1, 12, 5, None).is_err());
    assert!(encode_lossless(&pcm, 44100, 1, 16, 10, None).is_err());
    assert!(encode_lossy(&pcm, 44100, 1, 16, 1.5, None).is_err());

    // An odd-length buffer cannot be stereo.
    let odd = vec![0.0f32; 1001];
    assert!(encode_lossless(&odd, 44100, 2, 16, 5, None).is_err());
}

#[test]
fn empty_input_produces_empty_file() {
    let file = encode_lossless(&[], 44100, 1, 16, 5, None).unwrap();

    let audio = decode(&file).unwrap();
    assert_eq!(audio.total_samples, 0);
    assert!(audio.pcm.is_empty());

    let info = info(&file).unwrap();
    assert_eq!(info.total_samples, 0);
    assert!(validate(&file).unwrap());
}
