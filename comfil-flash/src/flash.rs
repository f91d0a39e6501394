// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Onboard QSPI flash access through the RP2040 ROM routines.
//!
//! Erase and program take XIP down while they run:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() or flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! Everything executed during steps 1-5 must live in RAM, so the wrappers
//! are placed in `.data` and the ROM function pointers are resolved up front.

use comfil_common::config::{FLASH_BASE, FLASH_PAGE_SIZE, STORE_ADDR, STORE_SIZE};
use comfil_common::record_store::{region_is_aligned, FlashRegion};

const _: () = assert!(region_is_aligned(STORE_ADDR, STORE_SIZE));

/// 64KB block erase; the ROM uses 4KB sector erases for unaligned ends.
const FLASH_BLOCK_SIZE: u32 = 1 << 16;
const FLASH_BLOCK_ERASE_CMD: u8 = 0xD8;

type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

static mut ROM_CONNECT_INTERNAL_FLASH: RomFnVoid = dummy_void;
static mut ROM_FLASH_EXIT_XIP: RomFnVoid = dummy_void;
static mut ROM_FLASH_RANGE_ERASE: RomFnErase = dummy_erase;
static mut ROM_FLASH_RANGE_PROGRAM: RomFnProgram = dummy_program;
static mut ROM_FLASH_FLUSH_CACHE: RomFnVoid = dummy_void;
static mut ROM_FLASH_ENTER_CMD_XIP: RomFnVoid = dummy_void;

unsafe extern "C" fn dummy_void() {}
unsafe extern "C" fn dummy_erase(_: u32, _: usize, _: u32, _: u8) {}
unsafe extern "C" fn dummy_program(_: u32, _: *const u8, _: usize) {}

/// Look up a ROM function by its two-character tag.
/// ROM table pointer at 0x14 and lookup function at 0x18 are 16-bit halfword pointers.
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *(0x14 as *const u16) as *const u16;
    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *(0x18 as *const u16) as usize,
        );
    lookup(fn_table, u16::from_le_bytes(*tag) as u32)
}

/// Resolve the ROM flash routines. Needs XIP active.
fn init() {
    unsafe {
        ROM_CONNECT_INTERNAL_FLASH =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"IF"));
        ROM_FLASH_EXIT_XIP = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"EX"));
        ROM_FLASH_RANGE_ERASE =
            core::mem::transmute::<usize, RomFnErase>(rom_func_lookup(b"RE"));
        ROM_FLASH_RANGE_PROGRAM =
            core::mem::transmute::<usize, RomFnProgram>(rom_func_lookup(b"RP"));
        ROM_FLASH_FLUSH_CACHE = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"FC"));
        ROM_FLASH_ENTER_CMD_XIP =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"CX"));
    }
}

/// # Safety
/// `init()` must have run. `offset` and `size` are flash-relative and
/// sector aligned, and the range holds no code.
#[link_section = ".data"]
#[inline(never)]
unsafe fn flash_erase(offset: u32, size: u32) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_ERASE(offset, size as usize, FLASH_BLOCK_SIZE, FLASH_BLOCK_ERASE_CMD);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// # Safety
/// `init()` must have run. `offset` is flash-relative and page aligned, and
/// `data` points to RAM.
#[link_section = ".data"]
#[inline(never)]
unsafe fn flash_program(offset: u32, data: *const u8, len: usize) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_PROGRAM(offset, data, len);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

fn flash_read(abs_addr: u32, buf: &mut [u8]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte = unsafe { ((abs_addr + i as u32) as *const u8).read_volatile() };
    }
}

/// The record store region of the onboard flash.
pub struct OnboardFlash {
    addr: u32,
    size: u32,
}

impl OnboardFlash {
    /// Resolve the ROM routines and hand out the store region. Call once.
    pub fn take() -> Self {
        init();
        Self {
            addr: STORE_ADDR,
            size: STORE_SIZE,
        }
    }

    fn flash_offset(&self, offset: u32) -> u32 {
        self.addr - FLASH_BASE + offset
    }
}

impl FlashRegion for OnboardFlash {
    fn capacity(&self) -> u32 {
        self.size
    }

    fn read(&self, offset: u32, buf: &mut [u8]) {
        flash_read(self.addr + offset, buf);
    }

    fn erase(&mut self, offset: u32, len: u32) {
        defmt::debug!("erase {=u32:#x} +{=u32}", self.addr + offset, len);
        unsafe { flash_erase(self.flash_offset(offset), len) }
    }

    fn program(&mut self, offset: u32, page: &[u8; FLASH_PAGE_SIZE as usize]) {
        unsafe { flash_program(self.flash_offset(offset), page.as_ptr(), page.len()) }
    }
}
