// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Line protocol shared by the device and the host sender.
//!
//! Host to device, one line each:
//! - `<filename>;<hex payload>` appends the decoded payload to `filename`
//! - any line without `;` is a status probe
//!
//! Device to host:
//! - `COMfiltrat0r ready\n` answers a probe
//! - `\rACK <filename>;<byte_count>\n` acknowledges a written chunk

use core::fmt::Write;

use heapless::String;
use thiserror::Error;

use crate::config::{MAX_FILENAME_LEN, MAX_REPLY_LEN};

/// Separates the filename from the hex payload. Only the first one counts.
pub const DELIMITER: u8 = b';';

/// Answer to a status probe.
pub const BANNER: &str = "COMfiltrat0r ready";

/// Prefix of a chunk acknowledgment. The carriage return lets a terminal
/// overwrite the echoed input line.
pub const ACK_PREFIX: &str = "\rACK ";

/// Probe line sent by the host sender before a transfer.
pub const PROBE_LINE: &str = "cyllective r0cks";

/// Errors in the framing of a chunk line.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum FrameError {
    #[error("filename is not valid UTF-8")]
    NameEncoding,
    #[error("filename too long")]
    NameTooLong,
    #[error("invalid hex payload: {0}")]
    Hex(hex::FromHexError),
}

impl From<hex::FromHexError> for FrameError {
    fn from(e: hex::FromHexError) -> Self {
        FrameError::Hex(e)
    }
}

/// Drop the line terminator left over by the reader (a trailing `\r`).
pub fn trim_line_ending(line: &[u8]) -> &[u8] {
    match line {
        [rest @ .., b'\r'] => rest,
        _ => line,
    }
}

/// A classified input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Probe,
    Chunk {
        name: &'a [u8],
        payload_hex: &'a [u8],
    },
}

impl<'a> Line<'a> {
    /// Classify a line by the presence of the delimiter. The payload is the
    /// whole remainder after the first delimiter.
    pub fn classify(line: &'a [u8]) -> Self {
        match line.iter().position(|&b| b == DELIMITER) {
            Some(pos) => Line::Chunk {
                name: &line[..pos],
                payload_hex: &line[pos + 1..],
            },
            None => Line::Probe,
        }
    }
}

/// A chunk line with a validated filename. The payload is still hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkMessage<'a> {
    pub filename: &'a str,
    pub payload_hex: &'a [u8],
}

impl<'a> ChunkMessage<'a> {
    pub fn parse(name: &'a [u8], payload_hex: &'a [u8]) -> Result<Self, FrameError> {
        if name.len() > MAX_FILENAME_LEN {
            return Err(FrameError::NameTooLong);
        }
        let filename = core::str::from_utf8(name).map_err(|_| FrameError::NameEncoding)?;
        Ok(Self {
            filename,
            payload_hex,
        })
    }

    /// Decode the payload into `out`, returning the decoded bytes.
    pub fn decode<'b>(&self, out: &'b mut [u8]) -> Result<&'b [u8], FrameError> {
        if self.payload_hex.len() % 2 != 0 {
            return Err(hex::FromHexError::OddLength.into());
        }
        let len = self.payload_hex.len() / 2;
        if len > out.len() {
            return Err(hex::FromHexError::InvalidStringLength.into());
        }
        hex::decode_to_slice(self.payload_hex, &mut out[..len])?;
        Ok(&out[..len])
    }
}

/// Format the acknowledgment line for a written chunk.
pub fn format_ack(filename: &str, bytes: usize) -> String<MAX_REPLY_LEN> {
    let mut reply = String::new();
    // Filenames are capped at MAX_FILENAME_LEN, so this always fits.
    let _ = writeln!(reply, "{ACK_PREFIX}{filename};{bytes}");
    reply
}

/// Format the probe answer.
pub fn format_banner() -> String<MAX_REPLY_LEN> {
    let mut reply = String::new();
    let _ = writeln!(reply, "{BANNER}");
    reply
}

/// An acknowledgment as seen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack<'a> {
    pub filename: &'a str,
    pub bytes: usize,
}

impl<'a> Ack<'a> {
    /// Parse a received line. Leading `\r` and trailing line endings are ignored.
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim_start_matches('\r').trim_end_matches(['\r', '\n']);
        let rest = line.strip_prefix("ACK ")?;
        let (filename, bytes) = rest.split_once(';')?;
        Some(Self {
            filename,
            bytes: bytes.parse().ok()?,
        })
    }
}

/// Whether a received line is the probe answer.
pub fn is_banner(line: &str) -> bool {
    line.trim_matches(['\r', '\n']) == BANNER
}

/// One encoded chunk line ready to be written to the port.
#[cfg(feature = "std")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLine {
    pub line: alloc::string::String,
    /// Decoded size of the payload, as the device will acknowledge it.
    pub bytes: usize,
}

/// Split `data` into chunk lines of at most `max_hex_chars` hex characters
/// each. Odd limits are rounded down to keep every chunk decodable.
#[cfg(feature = "std")]
pub fn encode_chunks(
    filename: &str,
    data: &[u8],
    max_hex_chars: usize,
) -> alloc::vec::Vec<ChunkLine> {
    let chunk_bytes = (max_hex_chars / 2).max(1);
    data.chunks(chunk_bytes)
        .map(|chunk| ChunkLine {
            line: alloc::format!("{filename};{}\r\n", hex::encode(chunk)),
            bytes: chunk.len(),
        })
        .collect()
}
