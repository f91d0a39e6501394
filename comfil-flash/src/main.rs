// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! COMfiltrat0r firmware, onboard flash variant.
//!
//! Receives hex-encoded file chunks over USB CDC and appends them to the
//! record store in the upper part of the onboard flash. The store is always
//! available, so the device comes up ready.

#![no_std]
#![no_main]

mod flash;
mod peripherals;

use comfil_common::config::{USB_PID_FLASH, USB_SERIAL_FLASH};
use comfil_common::record_store::RecordStore;
use comfil_common::usb_serial::UsbLineTransport;
use comfil_common::{Device, Outcome, Readiness};
use defmt_rtt as _;
use panic_probe as _;

use flash::OnboardFlash;

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

#[entry]
fn main() -> ! {
    defmt::println!("COMfiltrat0r (onboard flash) init");

    let p = peripherals::init();
    let readiness = Readiness::ready(p.led_pin);

    // Mounting may format the region, which stalls the bus; do it before USB.
    let store = RecordStore::mount(OnboardFlash::take());
    if store.was_formatted() {
        defmt::warn!("record store was corrupt, formatted");
    }
    if store.skipped_bytes() > 0 {
        defmt::warn!("skipped {=u32} bytes of an interrupted chunk", store.skipped_bytes());
    }
    defmt::println!("record store: {=u32} bytes free", store.free_bytes());

    let bus = p.usb.into_bus();
    let transport = match UsbLineTransport::open(bus, USB_PID_FLASH, USB_SERIAL_FLASH) {
        Ok(t) => t,
        Err(e) => defmt::panic!("USB init failed: {}", defmt::Debug2Format(&e)),
    };

    let mut device = Device::new(store, readiness, transport);

    defmt::println!("Ready");
    loop {
        let step = device.step();
        comfil_common::report(&step);
        if let Ok(Outcome::Appended { .. }) = step {
            defmt::debug!("{=u32} bytes free", device.storage().free_bytes());
        }
    }
}
