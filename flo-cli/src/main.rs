// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A thin command-line wrapper over the flo codec.
//!
//! PCM goes in and out as raw little-endian f32 frames; decoding foreign formats is out of
//! scope for the codec and therefore for this tool.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

use std::fs;
use std::io::ErrorKind;
use std::process;

use clap::{App, Arg, ArgMatches};
use log::error;

use flo::core::errors::Error as FloError;
use flo::QualityPreset;

// Exit codes of the tool.
const EXIT_OK: i32 = 0;
const EXIT_GENERAL: i32 = 1;
const EXIT_ARGS: i32 = 2;
const EXIT_NOT_FOUND: i32 = 3;
const EXIT_UNSUPPORTED: i32 = 4;
const EXIT_ENCODE: i32 = 5;
const EXIT_DECODE: i32 = 6;

enum CliError {
    Io(std::io::Error),
    Args(String),
    Encode(FloError),
    Decode(FloError),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Io(err) if err.kind() == ErrorKind::NotFound => EXIT_NOT_FOUND,
            CliError::Io(_) => EXIT_GENERAL,
            CliError::Args(_) => EXIT_ARGS,
            CliError::Encode(FloError::UnsupportedParameter(_)) => EXIT_UNSUPPORTED,
            CliError::Encode(_) => EXIT_ENCODE,
            CliError::Decode(FloError::UnsupportedVersion { .. }) => EXIT_UNSUPPORTED,
            CliError::Decode(FloError::UnsupportedParameter(_)) => EXIT_UNSUPPORTED,
            CliError::Decode(_) => EXIT_DECODE,
        }
    }

    fn message(&self) -> String {
        match self {
            CliError::Io(err) => err.to_string(),
            CliError::Args(msg) => msg.clone(),
            CliError::Encode(err) => format!("encode failed: {}", err),
            CliError::Decode(err) => format!("decode failed: {}", err),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> CliError {
        CliError::Io(err)
    }
}

fn main() {
    pretty_env_logger::init();

    let matches = App::new("flo-cli")
        .version("0.3")
        .about("Encode, decode, and inspect flo audio files")
        .subcommand(
            App::new("encode")
                .about("Encode raw f32le PCM into a flo file")
                .arg(Arg::new("INPUT").required(true).help("Raw PCM input file (f32le)"))
                .arg(Arg::new("output").long("output").short('o').takes_value(true).required(true))
                .arg(Arg::new("rate").long("rate").takes_value(true).required(true))
                .arg(Arg::new("channels").long("channels").takes_value(true).default_value("1"))
                .arg(Arg::new("bits").long("bits").takes_value(true).default_value("16"))
                .arg(
                    Arg::new("level")
                        .long("level")
                        .takes_value(true)
                        .default_value("5")
                        .help("Lossless effort, 0-9"),
                )
                .arg(
                    Arg::new("quality")
                        .long("quality")
                        .takes_value(true)
                        .help("Lossy quality in [0,1] or preset 0-4"),
                )
                .arg(
                    Arg::new("bitrate")
                        .long("bitrate")
                        .takes_value(true)
                        .conflicts_with("quality")
                        .help("Lossy target bitrate in kbps"),
                ),
        )
        .subcommand(
            App::new("decode")
                .about("Decode a flo file to raw f32le PCM")
                .arg(Arg::new("INPUT").required(true))
                .arg(Arg::new("output").long("output").short('o').takes_value(true).required(true)),
        )
        .subcommand(
            App::new("info")
                .about("Print stream information")
                .arg(Arg::new("INPUT").required(true)),
        )
        .subcommand(
            App::new("metadata")
                .about("Show or edit metadata")
                .arg(Arg::new("INPUT").required(true))
                .arg(
                    Arg::new("set")
                        .long("set")
                        .takes_value(true)
                        .multiple_occurrences(true)
                        .help("Set a text field, e.g. --set title=Song"),
                )
                .arg(Arg::new("strip").long("strip").help("Remove all metadata"))
                .arg(Arg::new("output").long("output").short('o').takes_value(true)),
        )
        .subcommand(
            App::new("validate")
                .about("Check the DATA chunk against its CRC32")
                .arg(Arg::new("INPUT").required(true)),
        )
        .get_matches();

    let result = match matches.subcommand() {
        Some(("encode", args)) => cmd_encode(args),
        Some(("decode", args)) => cmd_decode(args),
        Some(("info", args)) => cmd_info(args),
        Some(("metadata", args)) => cmd_metadata(args),
        Some(("validate", args)) => cmd_validate(args),
        _ => {
            eprintln!("a subcommand is required; try --help");
            process::exit(EXIT_ARGS);
        }
    };

    match result {
        Ok(code) => process::exit(code),
        Err(err) => {
            error!("{}", err.message());
            eprintln!("error: {}", err.message());
            process::exit(err.exit_code());
        }
    }
}

fn parse_arg<T: std::str::FromStr>(args: &ArgMatches, name: &str) -> Result<T, CliError> {
    let value = args.value_of(name).unwrap();
    value.parse().map_err(|_| CliError::Args(format!("invalid value for --{}", name)))
}

fn read_pcm(path: &str) -> Result<Vec<f32>, CliError> {
    let bytes = fs::read(path)?;
    if bytes.len() % 4 != 0 {
        return Err(CliError::Args("input length is not a whole number of f32 samples".into()));
    }

    Ok(bytes.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect())
}

fn cmd_encode(args: &ArgMatches) -> Result<i32, CliError> {
    let pcm = read_pcm(args.value_of("INPUT").unwrap())?;

    let rate: u32 = parse_arg(args, "rate")?;
    let channels: u8 = parse_arg(args, "channels")?;
    let bits: u8 = parse_arg(args, "bits")?;

    let file = if let Some(bitrate) = args.value_of("bitrate") {
        let kbps: u32 = bitrate
            .parse()
            .map_err(|_| CliError::Args("invalid value for --bitrate".into()))?;
        flo::encode_with_bitrate(&pcm, rate, channels, bits, kbps, None)
            .map_err(CliError::Encode)?
    }
    else if let Some(quality) = args.value_of("quality") {
        // Accept a preset index or a fractional quality.
        let quality = match quality.parse::<u8>() {
            Ok(level) => QualityPreset::from_level(level)
                .ok_or_else(|| CliError::Args("preset must be 0-4".into()))?
                .quality(),
            Err(_) => quality
                .parse::<f32>()
                .map_err(|_| CliError::Args("invalid value for --quality".into()))?,
        };
        flo::encode_lossy(&pcm, rate, channels, bits, quality, None).map_err(CliError::Encode)?
    }
    else {
        let level: u8 = parse_arg(args, "level")?;
        flo::encode_lossless(&pcm, rate, channels, bits, level, None).map_err(CliError::Encode)?
    };

    fs::write(args.value_of("output").unwrap(), &file)?;
    println!("wrote {} bytes", file.len());

    Ok(EXIT_OK)
}

fn cmd_decode(args: &ArgMatches) -> Result<i32, CliError> {
    let file = fs::read(args.value_of("INPUT").unwrap())?;

    let audio = flo::decode(&file).map_err(CliError::Decode)?;

    let mut out = Vec::with_capacity(audio.pcm.len() * 4);
    for &sample in &audio.pcm {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    fs::write(args.value_of("output").unwrap(), &out)?;

    println!(
        "decoded {} samples, {} Hz, {} channel(s)",
        audio.total_samples, audio.sample_rate, audio.channels
    );

    Ok(EXIT_OK)
}

fn cmd_info(args: &ArgMatches) -> Result<i32, CliError> {
    let file = fs::read(args.value_of("INPUT").unwrap())?;

    let info = flo::info(&file).map_err(CliError::Decode)?;

    println!("sample rate:   {} Hz", info.sample_rate);
    println!("channels:      {}", info.channels);
    println!("bit depth:     {}", info.bit_depth);
    println!("duration:      {:.3} s", info.duration_secs);
    println!("samples:       {}", info.total_samples);
    println!("mode:          {}", if info.is_lossy { "lossy" } else { "lossless" });
    if let Some(quality) = info.lossy_quality {
        println!("quality:       {:.2}", quality);
    }
    println!("compression:   {:.2}x", info.compression_ratio);

    Ok(EXIT_OK)
}

fn cmd_metadata(args: &ArgMatches) -> Result<i32, CliError> {
    let path = args.value_of("INPUT").unwrap();
    let file = fs::read(path)?;

    let strip = args.is_present("strip");
    let sets: Vec<&str> = args.values_of("set").map(|v| v.collect()).unwrap_or_default();

    if !strip && sets.is_empty() {
        let record = flo::read_metadata(&file).map_err(CliError::Decode)?;

        if record.is_empty() {
            println!("(no metadata)");
        }
        for (key, value) in record.iter() {
            println!("{}: {}", key, value);
        }
        return Ok(EXIT_OK);
    }

    let updated = if strip {
        flo::strip_metadata(&file).map_err(CliError::Decode)?
    }
    else {
        let mut record = flo::read_metadata(&file).map_err(CliError::Decode)?;
        for pair in sets {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| CliError::Args("--set expects key=value".into()))?;
            record.set_str(key, value);
        }
        flo::update_metadata(&file, &record).map_err(CliError::Encode)?
    };

    let output = args.value_of("output").unwrap_or(path);
    fs::write(output, &updated)?;
    println!("wrote {}", output);

    Ok(EXIT_OK)
}

fn cmd_validate(args: &ArgMatches) -> Result<i32, CliError> {
    let file = fs::read(args.value_of("INPUT").unwrap())?;

    if flo::validate(&file).map_err(CliError::Decode)? {
        println!("ok");
        Ok(EXIT_OK)
    }
    else {
        println!("crc mismatch");
        Ok(EXIT_GENERAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_exit_codes() {
        let not_found = CliError::Io(std::io::Error::new(ErrorKind::NotFound, "missing"));
        assert_eq!(not_found.exit_code(), EXIT_NOT_FOUND);

        let args = CliError::Args("bad".into());
        assert_eq!(args.exit_code(), EXIT_ARGS);

        let unsupported = CliError::Encode(FloError::UnsupportedParameter("rate"));
        assert_eq!(unsupported.exit_code(), EXIT_UNSUPPORTED);

        let decode = CliError::Decode(FloError::BadMagic);
        assert_eq!(decode.exit_code(), EXIT_DECODE);
    }
}
