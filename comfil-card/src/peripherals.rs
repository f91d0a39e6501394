// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Peripheral initialization for the SD card variant.

use comfil_common::config::SD_SPI_INIT_FREQ;
use hal::fugit::{HertzU32, RateExtU32};
use hal::gpio::{bank0, FunctionSioOutput, FunctionSpi, Pin, PinState, PullDown};
use hal::Clock;
use rp2040_hal as hal;
use rp2040_hal::usb::UsbBus;
use usb_device::class_prelude::UsbBusAllocator;

pub type LedPin = Pin<bank0::Gpio25, FunctionSioOutput, PullDown>;

pub type SdSck = Pin<bank0::Gpio14, FunctionSpi, PullDown>;
pub type SdMosi = Pin<bank0::Gpio15, FunctionSpi, PullDown>;
pub type SdMiso = Pin<bank0::Gpio12, FunctionSpi, PullDown>;
pub type SdCsPin = Pin<bank0::Gpio13, FunctionSioOutput, PullDown>;
pub type SdSpi = hal::spi::Spi<hal::spi::Enabled, hal::pac::SPI1, (SdMosi, SdMiso, SdSck), 8>;

/// Static storage for UsbBusAllocator (required by usb-device for 'static lifetime).
static mut USB_BUS: Option<UsbBusAllocator<UsbBus>> = None;

pub fn store_usb_bus(bus: UsbBusAllocator<UsbBus>) -> &'static UsbBusAllocator<UsbBus> {
    unsafe { (*core::ptr::addr_of_mut!(USB_BUS)).insert(bus) }
}

pub struct Peripherals {
    pub led_pin: LedPin,
    pub timer: hal::Timer,
    pub sd: SdPeripherals,
    pub usb: UsbPeripherals,
}

/// SPI1 and chip select, with the bus still at the card init clock.
pub struct SdPeripherals {
    pub spi: SdSpi,
    pub cs: SdCsPin,
    pub peripheral_freq: HertzU32,
}

pub struct UsbPeripherals {
    pub regs: hal::pac::USBCTRL_REGS,
    pub dpram: hal::pac::USBCTRL_DPRAM,
    pub clock: hal::clocks::UsbClock,
    pub resets: hal::pac::RESETS,
}

impl UsbPeripherals {
    pub fn into_bus(mut self) -> &'static UsbBusAllocator<UsbBus> {
        store_usb_bus(UsbBusAllocator::new(UsbBus::new(
            self.regs,
            self.dpram,
            self.clock,
            true,
            &mut self.resets,
        )))
    }
}

pub fn init() -> Peripherals {
    let mut pac = unsafe { hal::pac::Peripherals::steal() };

    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let Ok(clocks) = hal::clocks::init_clocks_and_plls(
        12_000_000u32,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    ) else {
        defmt::panic!("clock init failed");
    };

    let timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let peripheral_freq = clocks.peripheral_clock.freq();
    let spi = hal::spi::Spi::<_, _, _, 8>::new(
        pac.SPI1,
        (
            pins.gpio15.into_function::<FunctionSpi>(),
            pins.gpio12.into_function::<FunctionSpi>(),
            pins.gpio14.into_function::<FunctionSpi>(),
        ),
    )
    .init(
        &mut pac.RESETS,
        peripheral_freq,
        SD_SPI_INIT_FREQ.Hz(),
        embedded_hal::spi::MODE_0,
    );

    Peripherals {
        led_pin: pins.gpio25.into_push_pull_output(),
        timer,
        sd: SdPeripherals {
            spi,
            cs: pins.gpio13.into_push_pull_output_in_state(PinState::High),
            peripheral_freq,
        },
        usb: UsbPeripherals {
            regs: pac.USBCTRL_REGS,
            dpram: pac.USBCTRL_DPRAM,
            clock: clocks.usb_clock,
            resets: pac.RESETS,
        },
    }
}
