// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Append-only file store on raw NOR flash, used as onboard storage.
//!
//! The region is a log of page-aligned records. A record is one header page
//! followed by its data pages:
//!
//! ```text
//! +0   magic     u32  "CFR1"
//! +4   name_len  u16
//! +6   kind      u16  0xFFFF file data, 0x0000 skip
//! +8   data_len  u32
//! +12  crc       u32  CRC-32 (ISO HDLC) of bytes 0..12 and the name
//! +16  name      name_len bytes
//! ```
//!
//! A file's content is the data of all records carrying its name, in log
//! order. Data pages are programmed first and the header page last, so a
//! record only becomes visible once it is complete. The log ends at the
//! first erased header; any other unreadable header makes the store format
//! the whole region on mount.
//!
//! A chunk cut short by a power loss leaves programmed data pages behind an
//! erased header slot. Mount covers them with a skip record, which belongs
//! to no file, so later records never land on programmed cells.

use crc::{Crc, CRC_32_ISO_HDLC};
use heapless::String;
use thiserror::Error;

use crate::config::{FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE, MAX_PATH_LEN};
use crate::storage::{OpenMode, Storage};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub const RECORD_MAGIC: u32 = u32::from_le_bytes(*b"CFR1");
pub const HEADER_LEN: usize = 16;
pub const MAX_NAME_LEN: usize = PAGE - HEADER_LEN;

const PAGE: usize = FLASH_PAGE_SIZE as usize;
const ERASED_WORD: u32 = 0xFFFF_FFFF;

const KIND_FILE: u16 = 0xFFFF;
const KIND_SKIP: u16 = 0x0000;

/// Raw access to a flash region. Offsets are relative to the region start.
pub trait FlashRegion {
    /// Region size in bytes, a multiple of the sector size.
    fn capacity(&self) -> u32;

    fn read(&self, offset: u32, buf: &mut [u8]);

    /// Erase `len` bytes. Both values are sector aligned.
    fn erase(&mut self, offset: u32, len: u32);

    /// Program one erased page. `offset` is page aligned.
    fn program(&mut self, offset: u32, page: &[u8; PAGE]);
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    #[error("flash region full")]
    Full,
    #[error("name does not fit a record header")]
    NameTooLong,
    #[error("file not found")]
    NotFound,
}

/// A decoded record header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordHeader {
    pub name_len: u16,
    /// Covers leftover pages instead of holding file data.
    pub skip: bool,
    pub data_len: u32,
    pub crc: u32,
}

impl RecordHeader {
    /// Total size of the record in flash, header page included.
    pub fn footprint(&self) -> u32 {
        footprint(self.data_len)
    }

    fn encode(name: &str, data_len: u32, kind: u16) -> [u8; PAGE] {
        let mut page = [0xFFu8; PAGE];
        page[0..4].copy_from_slice(&RECORD_MAGIC.to_le_bytes());
        page[4..6].copy_from_slice(&(name.len() as u16).to_le_bytes());
        page[6..8].copy_from_slice(&kind.to_le_bytes());
        page[8..12].copy_from_slice(&data_len.to_le_bytes());
        page[HEADER_LEN..HEADER_LEN + name.len()].copy_from_slice(name.as_bytes());
        let crc = header_crc(&page[0..12], name.as_bytes());
        page[12..16].copy_from_slice(&crc.to_le_bytes());
        page
    }

    fn decode(page: &[u8; PAGE]) -> Option<(Self, &[u8])> {
        let word =
            |at: usize| u32::from_le_bytes([page[at], page[at + 1], page[at + 2], page[at + 3]]);
        if word(0) != RECORD_MAGIC {
            return None;
        }
        let name_len = u16::from_le_bytes([page[4], page[5]]);
        if name_len as usize > MAX_NAME_LEN {
            return None;
        }
        let skip = match u16::from_le_bytes([page[6], page[7]]) {
            KIND_FILE => false,
            KIND_SKIP => true,
            _ => return None,
        };
        let name = &page[HEADER_LEN..HEADER_LEN + name_len as usize];
        let header = Self {
            name_len,
            skip,
            data_len: word(8),
            crc: word(12),
        };
        if header_crc(&page[0..12], name) != header.crc {
            return None;
        }
        Some((header, name))
    }
}

fn header_crc(fields: &[u8], name: &[u8]) -> u32 {
    let mut digest = CRC32.digest();
    digest.update(fields);
    digest.update(name);
    digest.finalize()
}

fn footprint(data_len: u32) -> u32 {
    FLASH_PAGE_SIZE + pages_for(data_len as usize) * FLASH_PAGE_SIZE
}

fn pages_for(len: usize) -> u32 {
    len.div_ceil(PAGE) as u32
}

fn is_erased(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0xFF)
}

/// What the mount scan found at a header slot.
enum Slot {
    Record(RecordHeader),
    End,
    Corrupt,
}

/// An open record being written.
pub struct RecordFile {
    start: u32,
    name: String<MAX_PATH_LEN>,
    page: [u8; PAGE],
    fill: usize,
    data_len: u32,
}

pub struct RecordStore<F> {
    flash: F,
    /// Offset of the first free header slot.
    head: u32,
    formatted: bool,
    skipped: u32,
}

impl<F: FlashRegion> RecordStore<F> {
    /// Scan the region for the end of the log, formatting it if a header
    /// is neither valid nor erased. Programmed pages past the end of the log
    /// are fenced off with a skip record.
    pub fn mount(mut flash: F) -> Self {
        let mut offset = 0;
        let mut formatted = false;
        loop {
            match read_slot(&flash, offset) {
                Slot::Record(header) => offset += header.footprint(),
                Slot::End => break,
                Slot::Corrupt => {
                    let capacity = flash.capacity();
                    flash.erase(0, capacity);
                    offset = 0;
                    formatted = true;
                    break;
                }
            }
        }

        let mut skipped = 0;
        if !formatted {
            if let Some(last) = last_dirty_page(&flash, offset + FLASH_PAGE_SIZE) {
                // Header slot is erased, data pages end with the last dirty one
                skipped = last - offset;
                flash.program(offset, &RecordHeader::encode("", skipped, KIND_SKIP));
                offset += footprint(skipped);
            }
        }

        Self {
            flash,
            head: offset,
            formatted,
            skipped,
        }
    }

    /// Whether mounting had to format the region.
    pub fn was_formatted(&self) -> bool {
        self.formatted
    }

    /// Bytes of leftover pages mounting had to skip.
    pub fn skipped_bytes(&self) -> u32 {
        self.skipped
    }

    /// Bytes still available for new records, header pages included.
    pub fn free_bytes(&self) -> u32 {
        self.flash.capacity().saturating_sub(self.head)
    }

    pub fn record_count(&self) -> usize {
        let mut count = 0;
        self.for_each_record(|_, _| count += 1);
        count
    }

    /// Total content length of `name`, if it exists.
    pub fn file_len(&self, name: &str) -> Option<usize> {
        let mut len = None;
        self.for_each_record(|header, record_name| {
            if record_name == name.as_bytes() {
                *len.get_or_insert(0) += header.data_len as usize;
            }
        });
        len
    }

    /// Read the content of `name` into `out`. Returns the number of bytes
    /// copied, which is less than the file length if `out` is too short.
    pub fn read_file(&self, name: &str, out: &mut [u8]) -> Result<usize, StoreError> {
        let mut found = false;
        let mut copied = 0;
        let mut offset = 0;
        let mut page = [0u8; PAGE];
        while offset < self.head {
            self.flash.read(offset, &mut page);
            let Some((header, record_name)) = RecordHeader::decode(&page) else {
                break;
            };
            if !header.skip && record_name == name.as_bytes() {
                found = true;
                let take = (header.data_len as usize).min(out.len() - copied);
                self.flash
                    .read(offset + FLASH_PAGE_SIZE, &mut out[copied..copied + take]);
                copied += take;
            }
            offset += header.footprint();
        }
        if found {
            Ok(copied)
        } else {
            Err(StoreError::NotFound)
        }
    }

    pub fn release(self) -> F {
        self.flash
    }

    fn for_each_record(&self, mut f: impl FnMut(&RecordHeader, &[u8])) {
        let mut offset = 0;
        let mut page = [0u8; PAGE];
        while offset < self.head {
            self.flash.read(offset, &mut page);
            let Some((header, name)) = RecordHeader::decode(&page) else {
                break;
            };
            if !header.skip {
                f(&header, name);
            }
            offset += header.footprint();
        }
    }

    fn ensure_room(&self, start: u32, data_len: usize) -> Result<(), StoreError> {
        let end = start as u64 + PAGE as u64 + pages_for(data_len) as u64 * PAGE as u64;
        if end > u64::from(self.flash.capacity()) {
            Err(StoreError::Full)
        } else {
            Ok(())
        }
    }

    fn flush_page(&mut self, file: &mut RecordFile) {
        let data_pages = pages_for(file.data_len as usize - file.fill);
        let offset = file.start + FLASH_PAGE_SIZE + data_pages * FLASH_PAGE_SIZE;
        file.page[file.fill..].fill(0xFF);
        self.flash.program(offset, &file.page);
        file.fill = 0;
    }
}

fn read_slot<F: FlashRegion>(flash: &F, offset: u32) -> Slot {
    if offset + FLASH_PAGE_SIZE > flash.capacity() {
        return Slot::End;
    }
    let mut page = [0u8; PAGE];
    flash.read(offset, &mut page);
    if page[0..4] == ERASED_WORD.to_le_bytes() {
        // A slot the next header can't be programmed into
        return if is_erased(&page) { Slot::End } else { Slot::Corrupt };
    }
    match RecordHeader::decode(&page) {
        Some((header, _)) if offset + header.footprint() <= flash.capacity() => {
            Slot::Record(header)
        }
        _ => Slot::Corrupt,
    }
}

/// Offset of the last page at or after `from` holding programmed cells.
fn last_dirty_page<F: FlashRegion>(flash: &F, from: u32) -> Option<u32> {
    let mut page = [0u8; PAGE];
    let mut last = None;
    let mut offset = from;
    while offset + FLASH_PAGE_SIZE <= flash.capacity() {
        flash.read(offset, &mut page);
        if !is_erased(&page) {
            last = Some(offset);
        }
        offset += FLASH_PAGE_SIZE;
    }
    last
}

impl<F: FlashRegion> Storage for RecordStore<F> {
    type Error = StoreError;
    type File = RecordFile;

    fn exists(&mut self, path: &str) -> bool {
        self.file_len(path).is_some()
    }

    fn open(&mut self, path: &str, _mode: OpenMode) -> Result<RecordFile, StoreError> {
        if path.len() > MAX_NAME_LEN {
            return Err(StoreError::NameTooLong);
        }
        self.ensure_room(self.head, 0)?;
        let mut name = String::new();
        name.push_str(path).map_err(|_| StoreError::NameTooLong)?;
        Ok(RecordFile {
            start: self.head,
            name,
            page: [0xFFu8; PAGE],
            fill: 0,
            data_len: 0,
        })
    }

    fn write(&mut self, file: &mut RecordFile, data: &[u8]) -> Result<(), StoreError> {
        self.ensure_room(file.start, file.data_len as usize + data.len())?;
        let mut rest = data;
        while !rest.is_empty() {
            let take = rest.len().min(PAGE - file.fill);
            file.page[file.fill..file.fill + take].copy_from_slice(&rest[..take]);
            file.fill += take;
            file.data_len += take as u32;
            rest = &rest[take..];
            if file.fill == PAGE {
                self.flush_page(file);
            }
        }
        Ok(())
    }

    fn close(&mut self, mut file: RecordFile) -> Result<(), StoreError> {
        if file.fill > 0 {
            self.flush_page(&mut file);
        }
        let header = RecordHeader::encode(&file.name, file.data_len, KIND_FILE);
        self.flash.program(file.start, &header);
        self.head = file.start + footprint(file.data_len);
        Ok(())
    }
}

/// Check that a region size is usable by the store.
pub const fn region_is_aligned(addr: u32, size: u32) -> bool {
    addr % FLASH_SECTOR_SIZE == 0 && size % FLASH_SECTOR_SIZE == 0 && size > 0
}
