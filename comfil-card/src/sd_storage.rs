// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! SD card storage: FAT volume 0 of the card, exposed under `/sd`.
//!
//! Paths below the root are walked as FAT directories, which must already
//! exist. File and directory names follow the 8.3 rules of `embedded-sdmmc`.
//! The root directory stays open for the lifetime of the device; every other
//! directory is opened for one operation and closed again.

use core::fmt::Debug;

use comfil_common::config::SD_MOUNT_ROOT;
use comfil_common::storage::{split_path, OpenMode, Storage};
use embedded_sdmmc::{
    BlockDevice, Mode, RawDirectory, RawFile, TimeSource, Timestamp, VolumeIdx, VolumeManager,
};
use rp2040_hal as hal;
use thiserror::Error;

/// Card could not be brought up. Any of these ends in the fault blink.
#[derive(Debug, Error)]
pub enum MountError<E: Debug> {
    #[error("chip select pin unavailable")]
    ChipSelect,
    #[error("card did not answer: {0:?}")]
    Card(E),
    #[error("cannot open volume 0: {0:?}")]
    Volume(embedded_sdmmc::Error<E>),
    #[error("cannot open root directory: {0:?}")]
    RootDir(embedded_sdmmc::Error<E>),
}

#[derive(Debug, Error)]
pub enum CardError<E: Debug> {
    #[error("path is not below /sd or nests too deep")]
    Path,
    #[error("filesystem error: {0:?}")]
    Fs(embedded_sdmmc::Error<E>),
}

/// An open file and the directory it lives in.
pub struct SdFile {
    file: RawFile,
    dir: RawDirectory,
}

pub struct SdStorage<D: BlockDevice, T: TimeSource> {
    volume_mgr: VolumeManager<D, T>,
    root: RawDirectory,
}

impl<D, T> SdStorage<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    /// Open volume 0 and its root directory.
    pub fn mount(device: D, clock: T) -> Result<Self, MountError<D::Error>> {
        let volume_mgr = VolumeManager::new(device, clock);
        let volume = volume_mgr
            .open_raw_volume(VolumeIdx(0))
            .map_err(MountError::Volume)?;
        let root = volume_mgr
            .open_root_dir(volume)
            .map_err(MountError::RootDir)?;
        Ok(Self { volume_mgr, root })
    }

    /// Open each directory in turn, closing the previous one.
    fn walk(&self, dirs: &[&str]) -> Result<RawDirectory, embedded_sdmmc::Error<D::Error>> {
        let mut dir = self.root;
        for name in dirs {
            let next = self.volume_mgr.open_dir(dir, *name);
            self.release_dir(dir);
            dir = next?;
        }
        Ok(dir)
    }

    fn release_dir(&self, dir: RawDirectory) {
        if dir != self.root {
            let _ = self.volume_mgr.close_dir(dir);
        }
    }
}

impl<D, T> Storage for SdStorage<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    type Error = CardError<D::Error>;
    type File = SdFile;

    const MOUNT_ROOT: Option<&'static str> = Some(SD_MOUNT_ROOT);

    fn exists(&mut self, path: &str) -> bool {
        let Some(split) = split_path(path, SD_MOUNT_ROOT) else {
            return false;
        };
        let Ok(dir) = self.walk(&split.dirs) else {
            return false;
        };
        let found = self
            .volume_mgr
            .find_directory_entry(dir, split.file)
            .map(|entry| !entry.attributes.is_directory())
            .unwrap_or(false);
        self.release_dir(dir);
        found
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<SdFile, Self::Error> {
        let split = split_path(path, SD_MOUNT_ROOT).ok_or(CardError::Path)?;
        let dir = self.walk(&split.dirs).map_err(CardError::Fs)?;
        let fs_mode = match mode {
            OpenMode::Create => Mode::ReadWriteCreateOrTruncate,
            OpenMode::Append => Mode::ReadWriteAppend,
        };
        match self.volume_mgr.open_file_in_dir(dir, split.file, fs_mode) {
            Ok(file) => Ok(SdFile { file, dir }),
            Err(e) => {
                self.release_dir(dir);
                Err(CardError::Fs(e))
            }
        }
    }

    fn write(&mut self, file: &mut SdFile, data: &[u8]) -> Result<(), Self::Error> {
        self.volume_mgr
            .write(file.file, data)
            .map_err(CardError::Fs)
    }

    fn close(&mut self, file: SdFile) -> Result<(), Self::Error> {
        let closed = self.volume_mgr.close_file(file.file);
        self.release_dir(file.dir);
        closed.map_err(CardError::Fs)
    }
}

/// FAT timestamps from uptime; the board has no RTC.
/// Base date 2026-01-01, days wrap within one 28-day month.
pub struct UptimeClock {
    timer: hal::Timer,
}

impl UptimeClock {
    pub fn new(timer: hal::Timer) -> Self {
        Self { timer }
    }
}

impl TimeSource for UptimeClock {
    fn get_timestamp(&self) -> Timestamp {
        let uptime_secs = self.timer.get_counter().ticks() / 1_000_000;
        let rem = uptime_secs % 86_400;
        Timestamp {
            year_since_1970: 56,
            zero_indexed_month: 0,
            zero_indexed_day: ((uptime_secs / 86_400) % 28) as u8,
            hours: (rem / 3600) as u8,
            minutes: ((rem % 3600) / 60) as u8,
            seconds: (rem % 60) as u8,
        }
    }
}
