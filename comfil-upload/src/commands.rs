// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations: probing the device and sending files.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use comfil_common::config::{MAX_FILENAME_LEN, MAX_LINE_LEN};
use comfil_common::protocol::{encode_chunks, is_banner, Ack, ChunkLine, PROBE_LINE};
use comfil_common::DELIMITER;

use crate::transport::{Port, Transport};

/// Default chunk size in hex characters (5000 bytes per line).
pub const DEFAULT_CHUNK_HEX: usize = 10_000;

/// Unrelated lines tolerated while waiting for a reply.
const MAX_SKIPPED_LINES: usize = 8;

/// Check that the device answers and print its banner.
pub fn probe<P: Port>(transport: &mut Transport<P>) -> Result<()> {
    let banner = handshake(transport)?;
    println!("{}", banner.trim());
    Ok(())
}

/// Send a file, named after its base name unless `name` is given.
pub fn send<P: Port>(
    transport: &mut Transport<P>,
    file: &Path,
    name: Option<&str>,
    chunk_size: usize,
) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let name = match name {
        Some(name) => name,
        None => file
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("No usable file name in {}", file.display()))?,
    };

    println!("File:   {} ({} bytes)", file.display(), data.len());
    println!("Target: {}", name);
    println!();

    send_bytes(transport, name, &data, chunk_size)?;

    println!();
    println!("File sent successfully!");
    Ok(())
}

/// Send `data` as chunks of `name`, waiting for each acknowledgment.
pub fn send_bytes<P: Port>(
    transport: &mut Transport<P>,
    name: &str,
    data: &[u8],
    chunk_size: usize,
) -> Result<()> {
    let max_hex = check_target(name, chunk_size)?;

    let banner = handshake(transport)?;
    println!("Device: {}", banner.trim());

    let mut chunks = encode_chunks(name, data, max_hex);
    if chunks.is_empty() {
        // An empty chunk still creates the file
        chunks.push(ChunkLine {
            line: format!("{name};\r\n"),
            bytes: 0,
        });
    }

    let pb = ProgressBar::new(data.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let total = chunks.len();
    for (i, chunk) in chunks.iter().enumerate() {
        let sent = transport
            .send_line(&chunk.line)
            .and_then(|()| expect_ack(transport, name, chunk.bytes))
            .with_context(|| format!("Chunk {}/{} not acknowledged", i + 1, total));
        if let Err(e) = sent {
            pb.abandon();
            return Err(e);
        }
        pb.inc(chunk.bytes as u64);
    }

    pb.finish_with_message("Transfer complete");
    Ok(())
}

/// Validate the target name and chunk size. Returns the usable chunk size
/// in hex characters.
fn check_target(name: &str, chunk_size: usize) -> Result<usize> {
    if name.as_bytes().contains(&DELIMITER) {
        bail!("Target name must not contain ';'");
    }
    if name.contains(['\r', '\n']) {
        bail!("Target name must not contain line breaks");
    }
    if name.len() > MAX_FILENAME_LEN {
        bail!(
            "Target name is {} bytes, the device accepts at most {}",
            name.len(),
            MAX_FILENAME_LEN
        );
    }

    let chunk_hex = chunk_size & !1;
    if chunk_hex == 0 {
        bail!("Chunk size must be at least 2 hex characters");
    }
    // name, delimiter and \r must fit next to the payload
    let line_room = MAX_LINE_LEN - name.len() - 2;
    if chunk_hex > line_room {
        bail!(
            "Chunk size {} does not fit a device line, use at most {}",
            chunk_size,
            line_room & !1
        );
    }
    Ok(chunk_hex)
}

/// Send the probe line and wait for the banner.
fn handshake<P: Port>(transport: &mut Transport<P>) -> Result<String> {
    transport.drain_rx();
    transport.send_line(&format!("{PROBE_LINE}\r\n"))?;

    for _ in 0..MAX_SKIPPED_LINES {
        let line = transport
            .read_line()
            .context("Device did not answer the probe")?;
        if is_banner(&line) {
            return Ok(line);
        }
    }
    bail!("No banner among the device's replies")
}

/// Wait for the acknowledgment of a chunk of `bytes` bytes to `name`.
fn expect_ack<P: Port>(transport: &mut Transport<P>, name: &str, bytes: usize) -> Result<()> {
    for _ in 0..MAX_SKIPPED_LINES {
        let line = transport.read_line()?;
        let Some(ack) = Ack::parse(&line) else {
            continue;
        };
        if ack.filename != name || ack.bytes != bytes {
            bail!(
                "Unexpected ACK {};{} (expected {};{})",
                ack.filename,
                ack.bytes,
                name,
                bytes
            );
        }
        return Ok(());
    }
    bail!("No ACK among the device's replies")
}
