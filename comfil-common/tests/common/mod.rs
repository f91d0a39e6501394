// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! In-memory stand-ins for the hardware capabilities.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::rc::Rc;

use comfil_common::record_store::FlashRegion;
use comfil_common::storage::{LineAssembler, LineError, LineTransport, OpenMode, Storage};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

// =============================================================================
// Readiness pin and delay
// =============================================================================

/// Output pin recording every level it was driven to.
#[derive(Clone, Default)]
pub struct FakePin {
    pub levels: Rc<RefCell<Vec<bool>>>,
}

impl FakePin {
    pub fn last(&self) -> Option<bool> {
        self.levels.borrow().last().copied()
    }

    pub fn history(&self) -> Vec<bool> {
        self.levels.borrow().clone()
    }

    pub fn clear(&self) {
        self.levels.borrow_mut().clear();
    }
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.levels.borrow_mut().push(true);
        Ok(())
    }
}

/// Delay recording requested milliseconds instead of sleeping.
#[derive(Default)]
pub struct FakeDelay {
    pub delays_ms: Vec<u32>,
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.delays_ms.push(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
    }
}

// =============================================================================
// Storage
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemError {
    WriteFailed,
    OpenFailed,
}

#[derive(Debug)]
pub struct MemFile {
    pub path: String,
    pub mode: OpenMode,
}

/// Map of paths to contents, with switches to make operations fail.
#[derive(Default)]
pub struct MemStorage {
    pub files: HashMap<String, Vec<u8>>,
    pub opened: Vec<(String, OpenMode)>,
    pub closed: usize,
    pub fail_open: bool,
    pub fail_write: bool,
}

impl MemStorage {
    pub fn content(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }
}

impl Storage for MemStorage {
    type Error = MemError;
    type File = MemFile;

    fn exists(&mut self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<MemFile, MemError> {
        if self.fail_open {
            return Err(MemError::OpenFailed);
        }
        self.opened.push((path.to_string(), mode));
        match mode {
            OpenMode::Create => {
                self.files.insert(path.to_string(), Vec::new());
            }
            OpenMode::Append => {
                self.files.entry(path.to_string()).or_default();
            }
        }
        Ok(MemFile {
            path: path.to_string(),
            mode,
        })
    }

    fn write(&mut self, file: &mut MemFile, data: &[u8]) -> Result<(), MemError> {
        if self.fail_write {
            return Err(MemError::WriteFailed);
        }
        self.files
            .get_mut(&file.path)
            .ok_or(MemError::WriteFailed)?
            .extend_from_slice(data);
        Ok(())
    }

    fn close(&mut self, _file: MemFile) -> Result<(), MemError> {
        self.closed += 1;
        Ok(())
    }
}

/// Same as [`MemStorage`] but rooted under `/sd`, like the card backend.
#[derive(Default)]
pub struct RootedStorage(pub MemStorage);

impl Storage for RootedStorage {
    type Error = MemError;
    type File = MemFile;

    const MOUNT_ROOT: Option<&'static str> = Some("/sd");

    fn exists(&mut self, path: &str) -> bool {
        self.0.exists(path)
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<MemFile, MemError> {
        self.0.open(path, mode)
    }

    fn write(&mut self, file: &mut MemFile, data: &[u8]) -> Result<(), MemError> {
        self.0.write(file, data)
    }

    fn close(&mut self, file: MemFile) -> Result<(), MemError> {
        self.0.close(file)
    }
}

// =============================================================================
// Transport
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
pub struct Closed;

/// Serves scripted lines, then reports the transport as closed.
#[derive(Default)]
pub struct ScriptedTransport {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
    pub reads: usize,
}

impl ScriptedTransport {
    pub fn with_lines(lines: &[&str]) -> Self {
        Self {
            input: lines
                .iter()
                .flat_map(|l| l.bytes().chain(Some(b'\n')))
                .collect(),
            ..Self::default()
        }
    }

    pub fn output_str(&self) -> String {
        String::from_utf8(self.output.clone()).unwrap()
    }
}

impl LineTransport for ScriptedTransport {
    type Error = Closed;

    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, LineError<Closed>> {
        self.reads += 1;
        let mut assembler = LineAssembler::new();
        while let Some(byte) = self.input.pop_front() {
            if let Some(line) = assembler.push(buf, byte) {
                return line;
            }
        }
        Err(LineError::Transport(Closed))
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Closed> {
        self.output.extend_from_slice(bytes);
        Ok(())
    }
}

// =============================================================================
// Flash
// =============================================================================

/// NOR flash simulation: erase sets bytes to 0xFF, programming can only
/// clear bits.
pub struct RamFlash {
    pub mem: Vec<u8>,
    pub erases: usize,
    pub programs: usize,
}

impl RamFlash {
    pub fn erased(size: usize) -> Self {
        Self {
            mem: vec![0xFF; size],
            erases: 0,
            programs: 0,
        }
    }
}

impl FlashRegion for RamFlash {
    fn capacity(&self) -> u32 {
        self.mem.len() as u32
    }

    fn read(&self, offset: u32, buf: &mut [u8]) {
        let start = offset as usize;
        buf.copy_from_slice(&self.mem[start..start + buf.len()]);
    }

    fn erase(&mut self, offset: u32, len: u32) {
        assert_eq!(offset % 4096, 0, "erase offset not sector aligned");
        assert_eq!(len % 4096, 0, "erase length not sector aligned");
        self.erases += 1;
        self.mem[offset as usize..(offset + len) as usize].fill(0xFF);
    }

    fn program(&mut self, offset: u32, page: &[u8; 256]) {
        assert_eq!(offset % 256, 0, "program offset not page aligned");
        let start = offset as usize;
        for (cell, byte) in self.mem[start..start + 256].iter_mut().zip(page) {
            assert_eq!(*cell & byte, *byte, "programming a non-erased cell at {offset:#x}");
            *cell &= byte;
        }
        self.programs += 1;
    }
}
