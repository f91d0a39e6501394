// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Capabilities the line protocol handler is generic over: the storage
//! backend that receives chunks and the transport that delivers lines.

use core::fmt::Debug;

use heapless::{String, Vec};
use thiserror::Error;

use crate::config::{MAX_PATH_LEN, SD_MAX_DIR_DEPTH};

/// How a target file is opened for a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpenMode {
    /// The file did not exist and is created.
    Create,
    /// The file existed and is appended to.
    Append,
}

impl OpenMode {
    pub fn for_existing(exists: bool) -> Self {
        if exists {
            OpenMode::Append
        } else {
            OpenMode::Create
        }
    }
}

/// A filesystem-like backend. Every chunk goes through a full
/// open/write/close cycle; no handle outlives one chunk.
pub trait Storage {
    type Error: Debug;
    type File;

    /// Fixed root every filename is joined to, if any.
    const MOUNT_ROOT: Option<&'static str> = None;

    /// Whether `path` can be opened for reading.
    fn exists(&mut self, path: &str) -> bool;

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Self::File, Self::Error>;

    fn write(&mut self, file: &mut Self::File, data: &[u8]) -> Result<(), Self::Error>;

    fn close(&mut self, file: Self::File) -> Result<(), Self::Error>;
}

/// Join `filename` to the backend's mount root. The filename is used
/// verbatim, `..` and friends included.
pub fn resolve_path<S: Storage + ?Sized>(filename: &str) -> Option<String<MAX_PATH_LEN>> {
    let mut path = String::new();
    if let Some(root) = S::MOUNT_ROOT {
        path.push_str(root).ok()?;
        path.push('/').ok()?;
    }
    path.push_str(filename).ok()?;
    Some(path)
}

/// A resolved path below a mount root: the directories to walk, then the
/// file itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPath<'a> {
    pub dirs: Vec<&'a str, SD_MAX_DIR_DEPTH>,
    pub file: &'a str,
}

/// Split a path produced by [`resolve_path`] back into its components below
/// `root`. Returns `None` if the path is not under `root` or nests deeper
/// than [`SD_MAX_DIR_DEPTH`].
pub fn split_path<'a>(path: &'a str, root: &str) -> Option<SplitPath<'a>> {
    let rest = path.strip_prefix(root)?.strip_prefix('/')?;
    let mut dirs = Vec::new();
    let file = match rest.rsplit_once('/') {
        Some((parents, file)) => {
            for dir in parents.split('/') {
                dirs.push(dir).ok()?;
            }
            file
        }
        None => rest,
    };
    Some(SplitPath { dirs, file })
}

/// Errors from reading one line.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LineError<E> {
    /// The line did not fit the buffer. It has been consumed up to its
    /// terminator.
    #[error("line too long")]
    TooLong,
    #[error("transport error: {0:?}")]
    Transport(E),
}

/// Assembles `\n`-terminated lines from a byte stream into a caller buffer.
///
/// Bytes past the end of the buffer are dropped until the terminator, which
/// then reports [`LineError::TooLong`] and leaves the assembler ready for
/// the next line.
#[derive(Debug, Default)]
pub struct LineAssembler {
    len: usize,
    overflow: bool,
}

impl LineAssembler {
    pub const fn new() -> Self {
        Self {
            len: 0,
            overflow: false,
        }
    }

    /// Feed one byte. Returns the line length, `\n` excluded, once the
    /// terminator arrives.
    pub fn push<E>(&mut self, buf: &mut [u8], byte: u8) -> Option<Result<usize, LineError<E>>> {
        if byte == b'\n' {
            let done = if self.overflow {
                Err(LineError::TooLong)
            } else {
                Ok(self.len)
            };
            *self = Self::new();
            return Some(done);
        }
        match buf.get_mut(self.len) {
            Some(slot) => {
                *slot = byte;
                self.len += 1;
            }
            None => self.overflow = true,
        }
        None
    }
}

/// A blocking, line-oriented byte transport.
pub trait LineTransport {
    type Error: Debug;

    /// Block until a full `\n`-terminated line has been read into `buf`.
    /// Returns the line length without the `\n`.
    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, LineError<Self::Error>>;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}
