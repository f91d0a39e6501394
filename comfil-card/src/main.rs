// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! COMfiltrat0r firmware, SD card variant.
//!
//! Receives hex-encoded file chunks over USB CDC and appends them to files
//! under `/sd` on a FAT formatted card. If the card cannot be mounted the
//! LED blinks forever and the serial port is never read.

#![no_std]
#![no_main]

mod peripherals;
mod sd_storage;

use comfil_common::config::{SD_MOUNT_ROOT, SD_SPI_WORK_FREQ, USB_PID_CARD, USB_SERIAL_CARD};
use comfil_common::usb_serial::UsbLineTransport;
use comfil_common::{Device, Readiness};
use defmt_rtt as _;
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::{SdCard, SdCardError};
use panic_probe as _;
use rp2040_hal as hal;
use rp2040_hal::fugit::RateExtU32;

use peripherals::SdPeripherals;
use sd_storage::{MountError, SdStorage, UptimeClock};

defmt::timestamp!("{=u64:us}", { 0 });

use cortex_m_rt::entry;

#[unsafe(link_section = ".boot2")]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

type CardStorage = SdStorage<
    SdCard<ExclusiveDevice<peripherals::SdSpi, peripherals::SdCsPin, hal::Timer>, hal::Timer>,
    UptimeClock,
>;

/// Bring up the card at the init clock, switch to the working clock and
/// mount the first FAT volume.
fn mount_card(
    sd: SdPeripherals,
    timer: hal::Timer,
) -> Result<CardStorage, MountError<SdCardError>> {
    let SdPeripherals {
        spi,
        cs,
        peripheral_freq,
    } = sd;
    let spi_device = ExclusiveDevice::new(spi, cs, timer).map_err(|_| MountError::ChipSelect)?;
    let card = SdCard::new(spi_device, timer);

    let bytes = card.num_bytes().map_err(MountError::Card)?;
    defmt::println!("SD card: {} MB", bytes / (1024 * 1024));

    let actual = card.spi(|dev| {
        dev.bus_mut()
            .set_baudrate(peripheral_freq, SD_SPI_WORK_FREQ.Hz())
    });
    defmt::println!("SPI switched to {} Hz", actual.to_Hz());

    SdStorage::mount(card, UptimeClock::new(timer))
}

#[entry]
fn main() -> ! {
    defmt::println!("COMfiltrat0r (SD card) init");

    let p = peripherals::init();
    let mut timer = p.timer;
    let readiness = Readiness::new(p.led_pin);

    let bus = p.usb.into_bus();
    let transport = match UsbLineTransport::open(bus, USB_PID_CARD, USB_SERIAL_CARD) {
        Ok(t) => t,
        Err(e) => defmt::panic!("USB init failed: {}", defmt::Debug2Format(&e)),
    };

    let mounted = mount_card(p.sd, timer);
    if let Err(e) = &mounted {
        defmt::error!("mount failed: {}", defmt::Debug2Format(e));
    }
    let mut device = match Device::mount(mounted, readiness, transport) {
        Ok(device) => device,
        Err(fault) => fault.readiness.halt(&mut timer),
    };

    defmt::println!("Ready, serving {=str}", SD_MOUNT_ROOT);
    loop {
        let step = device.step();
        comfil_common::report(&step);
    }
}
