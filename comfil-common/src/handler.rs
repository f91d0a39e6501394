// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Line protocol handler and the chunk-append sequence.
//!
//! One [`Device`] owns the storage backend, the readiness signal and the
//! transport. Each call to [`Device::step`] blocks for one line and handles
//! it completely:
//! - probe: answer with the banner
//! - chunk: signal busy, check existence, decode, open, write, close,
//!   signal ready, acknowledge
//!
//! A chunk that fails to decode or to reach storage is dropped without an
//! acknowledgment; the device returns to `Ready` and keeps serving.

use embedded_hal::digital::OutputPin;
use heapless::String;
use thiserror::Error;

use crate::config::{MAX_CHUNK_BYTES, MAX_FILENAME_LEN, MAX_LINE_LEN};
use crate::protocol::{self, ChunkMessage, FrameError, Line};
use crate::signal::Readiness;
use crate::state::DeviceState;
use crate::storage::{resolve_path, LineError, LineTransport, OpenMode, Storage};

/// Why a chunk was dropped.
#[derive(Debug, Error)]
pub enum ChunkError<E> {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("path too long after joining the mount root")]
    PathTooLong,
    #[error("storage fault: {0:?}")]
    Storage(E),
}

/// Result of one protocol step.
#[derive(Debug)]
pub enum Outcome<E> {
    /// A probe was answered with the banner.
    Probe,
    /// A chunk was written and acknowledged.
    Appended {
        filename: String<MAX_FILENAME_LEN>,
        bytes: usize,
        created: bool,
    },
    /// A chunk was dropped without acknowledgment.
    Dropped(ChunkError<E>),
    /// An overlong line was thrown away.
    Discarded,
}

/// Storage mount failed. Carries the readiness signal back so the caller
/// can show the fault pattern.
pub struct MountFault<E, P> {
    pub error: E,
    pub readiness: Readiness<P>,
}

pub struct Device<S, P, T> {
    storage: S,
    readiness: Readiness<P>,
    transport: T,
    line: [u8; MAX_LINE_LEN],
    chunk: [u8; MAX_CHUNK_BYTES],
}

impl<S, P, T> Device<S, P, T>
where
    S: Storage,
    P: OutputPin,
    T: LineTransport,
{
    /// Build a device around already available storage. Enters `Ready`.
    pub fn new(storage: S, mut readiness: Readiness<P>, transport: T) -> Self {
        readiness.enter(DeviceState::Ready);
        Self {
            storage,
            readiness,
            transport,
            line: [0u8; MAX_LINE_LEN],
            chunk: [0u8; MAX_CHUNK_BYTES],
        }
    }

    /// Build a device from the result of a storage mount. On failure the
    /// readiness signal is moved to `StorageFault` and handed back; the
    /// transport is dropped unread.
    pub fn mount<E>(
        mounted: Result<S, E>,
        mut readiness: Readiness<P>,
        transport: T,
    ) -> Result<Self, MountFault<E, P>> {
        match mounted {
            Ok(storage) => Ok(Self::new(storage, readiness, transport)),
            Err(error) => {
                readiness.enter(DeviceState::after_mount(false));
                Err(MountFault { error, readiness })
            }
        }
    }

    pub fn state(&self) -> DeviceState {
        self.readiness.state()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Read and handle one line. Only transport errors are returned; chunk
    /// failures are reported as [`Outcome::Dropped`].
    pub fn step(&mut self) -> Result<Outcome<S::Error>, T::Error> {
        debug_assert!(self.state().accepts_input());
        let len = match self.transport.read_line(&mut self.line) {
            Ok(len) => len,
            Err(LineError::TooLong) => return Ok(Outcome::Discarded),
            Err(LineError::Transport(e)) => return Err(e),
        };
        let line = protocol::trim_line_ending(&self.line[..len]);

        match Line::classify(line) {
            Line::Probe => {
                self.transport
                    .write_all(protocol::format_banner().as_bytes())?;
                Ok(Outcome::Probe)
            }
            Line::Chunk { name, payload_hex } => {
                self.readiness.enter(DeviceState::Receiving);
                let appended = ChunkMessage::parse(name, payload_hex)
                    .map_err(ChunkError::from)
                    .and_then(|msg| {
                        append_chunk(&mut self.storage, &mut self.chunk, &msg)
                            .map(|(bytes, created)| (msg.filename, bytes, created))
                    });
                self.readiness.enter(DeviceState::Ready);

                match appended {
                    Ok((filename, bytes, created)) => {
                        self.transport
                            .write_all(protocol::format_ack(filename, bytes).as_bytes())?;
                        let mut name = String::new();
                        // parse() capped the filename at MAX_FILENAME_LEN
                        let _ = name.push_str(filename);
                        Ok(Outcome::Appended {
                            filename: name,
                            bytes,
                            created,
                        })
                    }
                    Err(e) => Ok(Outcome::Dropped(e)),
                }
            }
        }
    }
}

/// Append one chunk to its target file. Returns the number of bytes written
/// and whether the file was created.
fn append_chunk<S: Storage>(
    storage: &mut S,
    buf: &mut [u8],
    msg: &ChunkMessage<'_>,
) -> Result<(usize, bool), ChunkError<S::Error>> {
    let path = resolve_path::<S>(msg.filename).ok_or(ChunkError::PathTooLong)?;

    // Not atomic with the open below; only one actor ever touches storage.
    let mode = OpenMode::for_existing(storage.exists(&path));

    // Decoded before opening so a bad payload never creates an empty file.
    let data = msg.decode(buf)?;

    let mut file = storage.open(&path, mode).map_err(ChunkError::Storage)?;
    let written = storage.write(&mut file, data);
    let closed = storage.close(file);
    written.map_err(ChunkError::Storage)?;
    closed.map_err(ChunkError::Storage)?;

    Ok((data.len(), mode == OpenMode::Create))
}
