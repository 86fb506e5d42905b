// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `meta` module provides the structured metadata surface over the META chunk.
//!
//! Metadata is a single MessagePack map. A fixed set of keys is recognized and exposed through
//! typed accessors, but the record is open: the raw value map is the canonical store, so keys
//! this implementation does not know about survive a read-modify-write cycle untouched.
//!
//! Replacing metadata never touches the audio payload. [`update_metadata`] copies the header,
//! TOC, DATA, and EXTRA chunks verbatim, rewrites only META and the header's `meta_size` field,
//! and leaves the DATA checksum valid.

use std::collections::BTreeMap;

use rmpv::Value;

use flo_core::errors::{Error, Result};

use crate::container::ContainerRef;
use crate::header::META_SIZE_OFFSET;

/// The recognized metadata keys.
pub mod keys {
    // ID3v2.4-equivalent text fields.
    pub const TITLE: &str = "title";
    pub const ARTIST: &str = "artist";
    pub const ALBUM: &str = "album";
    pub const ALBUM_ARTIST: &str = "album_artist";
    pub const COMPOSER: &str = "composer";
    pub const GENRE: &str = "genre";
    pub const DATE: &str = "date";
    pub const RELEASE_DATE: &str = "release_date";
    pub const COPYRIGHT: &str = "copyright";
    pub const PUBLISHER: &str = "publisher";
    pub const ISRC: &str = "isrc";
    pub const LANGUAGE: &str = "language";

    // Numbering.
    pub const TRACK_NUMBER: &str = "track_number";
    pub const TRACK_TOTAL: &str = "track_total";
    pub const DISC_NUMBER: &str = "disc_number";
    pub const DISC_TOTAL: &str = "disc_total";

    // Musical attributes.
    pub const BPM: &str = "bpm";
    pub const KEY: &str = "key";

    // Attachments and long-form text.
    pub const PICTURES: &str = "pictures";
    pub const COMMENT: &str = "comment";
    pub const LYRICS: &str = "lyrics";
    pub const SYNCED_LYRICS: &str = "synced_lyrics";

    // Flo-specific extensions.
    pub const SECTION_MARKERS: &str = "section_markers";
    pub const BPM_MAP: &str = "bpm_map";
    pub const KEY_CHANGES: &str = "key_changes";
    pub const LOUDNESS_PROFILE: &str = "loudness_profile";
    pub const INTEGRATED_LOUDNESS_LUFS: &str = "integrated_loudness_lufs";
    pub const LOUDNESS_RANGE_LU: &str = "loudness_range_lu";
    pub const TRUE_PEAK_DBTP: &str = "true_peak_dbtp";
    pub const WAVEFORM_DATA: &str = "waveform_data";
    pub const SPECTRUM_FINGERPRINT: &str = "spectrum_fingerprint";
    pub const CREATOR_NOTES: &str = "creator_notes";
    pub const COLLABORATION_CREDITS: &str = "collaboration_credits";
    pub const REMIX_CHAIN: &str = "remix_chain";
    pub const ANIMATED_COVER: &str = "animated_cover";
    pub const COVER_VARIANTS: &str = "cover_variants";
}

/// The role of an attached picture, following the ID3v2 APIC type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureKind {
    Other,
    FileIcon,
    OtherIcon,
    FrontCover,
    BackCover,
    Leaflet,
    Media,
    LeadArtist,
    Artist,
    Conductor,
    Band,
    Composer,
    Lyricist,
    RecordingLocation,
    DuringRecording,
    DuringPerformance,
    ScreenCapture,
    Illustration,
    BandLogo,
    PublisherLogo,
}

impl PictureKind {
    pub fn from_tag(tag: u8) -> PictureKind {
        match tag {
            1 => PictureKind::FileIcon,
            2 => PictureKind::OtherIcon,
            3 => PictureKind::FrontCover,
            4 => PictureKind::BackCover,
            5 => PictureKind::Leaflet,
            6 => PictureKind::Media,
            7 => PictureKind::LeadArtist,
            8 => PictureKind::Artist,
            9 => PictureKind::Conductor,
            10 => PictureKind::Band,
            11 => PictureKind::Composer,
            12 => PictureKind::Lyricist,
            13 => PictureKind::RecordingLocation,
            14 => PictureKind::DuringRecording,
            15 => PictureKind::DuringPerformance,
            16 => PictureKind::ScreenCapture,
            18 => PictureKind::Illustration,
            19 => PictureKind::BandLogo,
            20 => PictureKind::PublisherLogo,
            _ => PictureKind::Other,
        }
    }

    pub fn tag(&self) -> u8 {
        match *self {
            PictureKind::Other => 0,
            PictureKind::FileIcon => 1,
            PictureKind::OtherIcon => 2,
            PictureKind::FrontCover => 3,
            PictureKind::BackCover => 4,
            PictureKind::Leaflet => 5,
            PictureKind::Media => 6,
            PictureKind::LeadArtist => 7,
            PictureKind::Artist => 8,
            PictureKind::Conductor => 9,
            PictureKind::Band => 10,
            PictureKind::Composer => 11,
            PictureKind::Lyricist => 12,
            PictureKind::RecordingLocation => 13,
            PictureKind::DuringRecording => 14,
            PictureKind::DuringPerformance => 15,
            PictureKind::ScreenCapture => 16,
            PictureKind::Illustration => 18,
            PictureKind::BandLogo => 19,
            PictureKind::PublisherLogo => 20,
        }
    }
}

/// An attached picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub mime: String,
    pub kind: PictureKind,
    pub data: Vec<u8>,
}

impl Picture {
    fn to_value(&self) -> Value {
        Value::Map(vec![
            (Value::from("mime"), Value::from(self.mime.as_str())),
            (Value::from("type"), Value::from(self.kind.tag())),
            (Value::from("data"), Value::Binary(self.data.clone())),
        ])
    }

    fn from_value(value: &Value) -> Option<Picture> {
        let map = value.as_map()?;
        let mut mime = None;
        let mut kind = PictureKind::Other;
        let mut data = None;

        for (key, value) in map {
            match key.as_str()? {
                "mime" => mime = Some(value.as_str()?.to_string()),
                "type" => kind = PictureKind::from_tag(value.as_u64()? as u8),
                "data" => data = Some(value.as_slice()?.to_vec()),
                _ => (),
            }
        }

        Some(Picture { mime: mime?, kind, data: data? })
    }
}

/// One timestamped line of synchronized lyrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedLyricLine {
    pub timestamp_ms: u32,
    pub text: String,
}

/// Synchronized lyrics: a language tag and timestamped lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedLyrics {
    pub language: String,
    pub lines: Vec<SyncedLyricLine>,
}

impl SyncedLyrics {
    fn to_value(&self) -> Value {
        let lines = self
            .lines
            .iter()
            .map(|line| {
                Value::Array(vec![
                    Value::from(line.timestamp_ms),
                    Value::from(line.text.as_str()),
                ])
            })
            .collect();

        Value::Map(vec![
            (Value::from("language"), Value::from(self.language.as_str())),
            (Value::from("lines"), Value::Array(lines)),
        ])
    }

    fn from_value(value: &Value) -> Option<SyncedLyrics> {
        let map = value.as_map()?;
        let mut language = None;
        let mut lines = Vec::new();

        for (key, value) in map {
            match key.as_str()? {
                "language" => language = Some(value.as_str()?.to_string()),
                "lines" => {
                    for line in value.as_array()? {
                        let pair = line.as_array()?;
                        if pair.len() != 2 {
                            return None;
                        }
                        lines.push(SyncedLyricLine {
                            timestamp_ms: pair[0].as_u64()? as u32,
                            text: pair[1].as_str()?.to_string(),
                        });
                    }
                }
                _ => (),
            }
        }

        Some(SyncedLyrics { language: language?, lines })
    }
}

/// A named position within the audio, e.g. "chorus" at 42 000 ms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMarker {
    pub label: String,
    pub start_ms: u32,
}

/// Precomputed waveform peaks for display purposes.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformData {
    pub peaks: Vec<f32>,
    pub peaks_per_second: u32,
    pub channels: u8,
}

impl WaveformData {
    fn to_value(&self) -> Value {
        Value::Map(vec![
            (
                Value::from("peaks"),
                Value::Array(self.peaks.iter().map(|&p| Value::from(p)).collect()),
            ),
            (Value::from("peaks_per_second"), Value::from(self.peaks_per_second)),
            (Value::from("channels"), Value::from(self.channels)),
        ])
    }

    fn from_value(value: &Value) -> Option<WaveformData> {
        let map = value.as_map()?;
        let mut peaks = Vec::new();
        let mut peaks_per_second = None;
        let mut channels = None;

        for (key, value) in map {
            match key.as_str()? {
                "peaks" => {
                    for peak in value.as_array()? {
                        peaks.push(peak.as_f64()? as f32);
                    }
                }
                "peaks_per_second" => peaks_per_second = Some(value.as_u64()? as u32),
                "channels" => channels = Some(value.as_u64()? as u8),
                _ => (),
            }
        }

        Some(WaveformData { peaks, peaks_per_second: peaks_per_second?, channels: channels? })
    }
}

/// An open metadata record backed by a MessagePack value map.
///
/// All accessors are views over the raw map. Serialization is deterministic: keys are emitted in
/// lexicographic order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataRecord {
    map: BTreeMap<String, Value>,
}

impl MetadataRecord {
    pub fn new() -> MetadataRecord {
        MetadataRecord { map: BTreeMap::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Raw access to any key, recognized or not.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Raw insertion of any key, recognized or not.
    pub fn insert(&mut self, key: &str, value: Value) {
        self.map.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.remove(key)
    }

    /// Iterates over every (key, value) pair in serialization order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(|v| v.as_str())
    }

    pub fn set_str(&mut self, key: &str, value: &str) {
        self.map.insert(key.to_string(), Value::from(value));
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.map.get(key).and_then(|v| v.as_u64()).map(|v| v as u32)
    }

    pub fn set_u32(&mut self, key: &str, value: u32) {
        self.map.insert(key.to_string(), Value::from(value));
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.map.get(key).and_then(|v| v.as_f64())
    }

    pub fn set_f64(&mut self, key: &str, value: f64) {
        self.map.insert(key.to_string(), Value::from(value));
    }

    pub fn title(&self) -> Option<&str> {
        self.get_str(keys::TITLE)
    }

    pub fn artist(&self) -> Option<&str> {
        self.get_str(keys::ARTIST)
    }

    pub fn album(&self) -> Option<&str> {
        self.get_str(keys::ALBUM)
    }

    pub fn bpm(&self) -> Option<u32> {
        self.get_u32(keys::BPM)
    }

    pub fn pictures(&self) -> Vec<Picture> {
        self.map
            .get(keys::PICTURES)
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(Picture::from_value).collect())
            .unwrap_or_default()
    }

    pub fn set_pictures(&mut self, pictures: &[Picture]) {
        let values = pictures.iter().map(Picture::to_value).collect();
        self.map.insert(keys::PICTURES.to_string(), Value::Array(values));
    }

    pub fn synced_lyrics(&self) -> Option<SyncedLyrics> {
        self.map.get(keys::SYNCED_LYRICS).and_then(SyncedLyrics::from_value)
    }

    pub fn set_synced_lyrics(&mut self, lyrics: &SyncedLyrics) {
        self.map.insert(keys::SYNCED_LYRICS.to_string(), lyrics.to_value());
    }

    pub fn section_markers(&self) -> Vec<SectionMarker> {
        let Some(arr) = self.map.get(keys::SECTION_MARKERS).and_then(|v| v.as_array()) else {
            return Vec::new();
        };

        arr.iter()
            .filter_map(|v| {
                let pair = v.as_array()?;
                if pair.len() != 2 {
                    return None;
                }
                Some(SectionMarker {
                    label: pair[0].as_str()?.to_string(),
                    start_ms: pair[1].as_u64()? as u32,
                })
            })
            .collect()
    }

    pub fn set_section_markers(&mut self, markers: &[SectionMarker]) {
        let values = markers
            .iter()
            .map(|m| {
                Value::Array(vec![Value::from(m.label.as_str()), Value::from(m.start_ms)])
            })
            .collect();
        self.map.insert(keys::SECTION_MARKERS.to_string(), Value::Array(values));
    }

    pub fn waveform_data(&self) -> Option<WaveformData> {
        self.map.get(keys::WAVEFORM_DATA).and_then(WaveformData::from_value)
    }

    pub fn set_waveform_data(&mut self, waveform: &WaveformData) {
        self.map.insert(keys::WAVEFORM_DATA.to_string(), waveform.to_value());
    }

    /// Decodes a record from the bytes of a META chunk. An empty chunk is an empty record.
    pub fn from_msgpack(buf: &[u8]) -> Result<MetadataRecord> {
        if buf.is_empty() {
            return Ok(MetadataRecord::new());
        }

        let mut reader = buf;
        let value = rmpv::decode::read_value(&mut reader)
            .map_err(|_| Error::MetadataParse("invalid messagepack"))?;

        let Value::Map(pairs) = value else {
            return Err(Error::MetadataParse("metadata root is not a map"));
        };

        let mut map = BTreeMap::new();

        for (key, value) in pairs {
            let Some(key) = key.as_str() else {
                return Err(Error::MetadataParse("metadata key is not a string"));
            };
            map.insert(key.to_string(), value);
        }

        Ok(MetadataRecord { map })
    }

    /// Encodes the record as a META chunk. An empty record produces an empty chunk.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        if self.map.is_empty() {
            return Ok(Vec::new());
        }

        let pairs = self
            .map
            .iter()
            .map(|(k, v)| (Value::from(k.as_str()), v.clone()))
            .collect();

        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &Value::Map(pairs))
            .map_err(|_| Error::MetadataSerialize("unencodable value"))?;

        Ok(buf)
    }
}

/// Parses the META chunk of a flo file into a metadata record.
pub fn read_metadata(file: &[u8]) -> Result<MetadataRecord> {
    let container = ContainerRef::parse(file)?;
    MetadataRecord::from_msgpack(container.meta)
}

/// Returns true if the file carries a non-empty META chunk.
pub fn has_metadata(file: &[u8]) -> Result<bool> {
    let container = ContainerRef::parse(file)?;
    Ok(!container.meta.is_empty())
}

/// Builds a new file with the META chunk replaced by `record`.
///
/// The header (except `meta_size`), TOC, DATA, and EXTRA bytes are copied verbatim; no audio
/// codec runs, and the DATA checksum remains valid.
pub fn update_metadata(file: &[u8], record: &MetadataRecord) -> Result<Vec<u8>> {
    let container = ContainerRef::parse(file)?;

    let meta = record.to_msgpack()?;
    let meta_start = file.len() - container.meta.len();

    let mut out = Vec::with_capacity(meta_start + meta.len());
    out.extend_from_slice(&file[..meta_start]);
    out.extend_from_slice(&meta);

    out[META_SIZE_OFFSET..META_SIZE_OFFSET + 8]
        .copy_from_slice(&(meta.len() as u64).to_le_bytes());

    Ok(out)
}

/// Removes the META chunk entirely.
pub fn strip_metadata(file: &[u8]) -> Result<Vec<u8>> {
    update_metadata(file, &MetadataRecord::new())
}
