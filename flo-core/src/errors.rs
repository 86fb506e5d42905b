// Flo
// Copyright (c) 2026 The Project Flo Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type.

use std::error;
use std::fmt;
use std::io;
use std::result;

/// `Error` provides an enumeration of all possible errors reported by Flo.
#[derive(Debug)]
pub enum Error {
    /// The stream does not start with the flo magic signature.
    BadMagic,
    /// The container was written by an unsupported version of the format.
    UnsupportedVersion { major: u8, minor: u8 },
    /// The chunk sizes declared in the header do not add up to the length of the file.
    SizeInconsistent(&'static str),
    /// A chunk ends before its declared size.
    TruncatedChunk(&'static str),
    /// The table of contents is malformed: entries are not strictly ascending, or an entry
    /// extends past the end of the DATA chunk.
    CorruptToc(&'static str),
    /// The CRC32 stored in the header does not match the DATA chunk. Only reported by the
    /// explicit validate operation; decoding proceeds without checking it.
    CrcMismatch { expected: u32, actual: u32 },
    /// A frame header carries a reserved or unknown frame type.
    UnknownFrameType(u8),
    /// A channel payload's declared size disagrees with the bytes its codec consumed.
    ChannelSizeMismatch { declared: u32, actual: u32 },
    /// A bitstream ended before the expected number of symbols were read.
    TruncatedBitstream(&'static str),
    /// The linear predictor produced a non-finite or unstable recursion.
    PredictorUnstable,
    /// A transform payload is internally inconsistent (bad block kind, coefficient count
    /// overflow, or an illegal block sequence).
    TransformOverflow(&'static str),
    /// An audio parameter is outside the supported range.
    UnsupportedParameter(&'static str),
    /// The META chunk does not contain a well-formed MessagePack map.
    MetadataParse(&'static str),
    /// A metadata record could not be serialized.
    MetadataSerialize(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::BadMagic => {
                write!(f, "missing flo magic signature")
            }
            Error::UnsupportedVersion { major, minor } => {
                write!(f, "unsupported format version: {}.{}", major, minor)
            }
            Error::SizeInconsistent(msg) => {
                write!(f, "inconsistent chunk sizes: {}", msg)
            }
            Error::TruncatedChunk(msg) => {
                write!(f, "truncated chunk: {}", msg)
            }
            Error::CorruptToc(msg) => {
                write!(f, "corrupt table of contents: {}", msg)
            }
            Error::CrcMismatch { expected, actual } => {
                write!(f, "crc mismatch: expected {:#010x}, got {:#010x}", expected, actual)
            }
            Error::UnknownFrameType(tag) => {
                write!(f, "unknown frame type: {}", tag)
            }
            Error::ChannelSizeMismatch { declared, actual } => {
                write!(f, "channel size mismatch: declared {}, consumed {}", declared, actual)
            }
            Error::TruncatedBitstream(msg) => {
                write!(f, "truncated bitstream: {}", msg)
            }
            Error::PredictorUnstable => {
                write!(f, "predictor recursion is unstable")
            }
            Error::TransformOverflow(msg) => {
                write!(f, "malformed transform payload: {}", msg)
            }
            Error::UnsupportedParameter(msg) => {
                write!(f, "unsupported parameter: {}", msg)
            }
            Error::MetadataParse(msg) => {
                write!(f, "malformed metadata: {}", msg)
            }
            Error::MetadataSerialize(msg) => {
                write!(f, "unserializable metadata: {}", msg)
            }
        }
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        // The slice-backed readers in `io` only ever produce unexpected-EOF errors.
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::TruncatedBitstream("unexpected end of stream"),
            _ => Error::TruncatedBitstream("io error"),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Convenience function to create a truncated chunk error.
pub fn truncated_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::TruncatedChunk(desc))
}

/// Convenience function to create a truncated bitstream error.
pub fn bitstream_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::TruncatedBitstream(desc))
}

/// Convenience function to create a corrupt table-of-contents error.
pub fn corrupt_toc_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::CorruptToc(desc))
}

/// Convenience function to create an unsupported parameter error.
pub fn unsupported_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::UnsupportedParameter(desc))
}

/// Convenience function to create a malformed transform payload error.
pub fn transform_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::TransformOverflow(desc))
}
