// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Build-time configuration shared by both firmware variants.

// --- Buffers ---

/// Longest accepted input line, terminator excluded.
pub const MAX_LINE_LEN: usize = 20 * 1024;

/// Largest decoded chunk a single line can carry.
pub const MAX_CHUNK_BYTES: usize = MAX_LINE_LEN / 2;

pub const MAX_FILENAME_LEN: usize = 128;

/// Filename joined to a mount root.
pub const MAX_PATH_LEN: usize = 160;

/// Longest reply line: `\rACK `, filename, `;`, a usize, `\n`.
pub const MAX_REPLY_LEN: usize = MAX_FILENAME_LEN + 32;

// --- Readiness signal ---

/// Half period of the storage fault blink (250 ms on, 250 ms off).
pub const FAULT_BLINK_HALF_PERIOD_MS: u32 = 250;

// --- Removable storage (SD card over SPI) ---

pub const SD_MOUNT_ROOT: &str = "/sd";

/// SPI clock while the card is being initialized.
pub const SD_SPI_INIT_FREQ: u32 = 400_000;

/// SPI clock once the card answered.
pub const SD_SPI_WORK_FREQ: u32 = 16_000_000;

/// Deepest directory nesting walked below the mount root.
pub const SD_MAX_DIR_DEPTH: usize = 4;

// --- Onboard storage (record store in QSPI flash) ---

pub const FLASH_BASE: u32 = 0x1000_0000;
pub const FLASH_SECTOR_SIZE: u32 = 4096;
pub const FLASH_PAGE_SIZE: u32 = 256;

/// Start of the record store, right above a 512KB firmware image.
pub const STORE_ADDR: u32 = 0x1008_0000;

/// 1.5MB, up to the end of the 2MB flash.
pub const STORE_SIZE: u32 = 0x0018_0000;

// --- USB ---

pub const USB_VID: u16 = 0x2E8A;
pub const USB_PID_CARD: u16 = 0x000A;
pub const USB_PID_FLASH: u16 = 0x000B;
pub const USB_MANUFACTURER: &str = "cyllective";
pub const USB_PRODUCT: &str = "COMfiltrat0r";
pub const USB_SERIAL_CARD: &str = "CF-SD01";
pub const USB_SERIAL_FLASH: &str = "CF-FL01";

/// Baud rate the host opens the CDC port with (ignored by USB CDC itself).
pub const DEFAULT_BAUD: u32 = 115_200;
