// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Blocking line transport over USB CDC.
//!
//! Reading a line polls the USB device until a `\n` arrives, so the device
//! keeps enumerating and answering the host while it waits.

use usb_device::bus::{UsbBus, UsbBusAllocator};
use usb_device::device::BuilderError;
use usb_device::prelude::*;
use usbd_serial::SerialPort;

use crate::config::{USB_MANUFACTURER, USB_PRODUCT, USB_VID};
use crate::storage::{LineAssembler, LineError, LineTransport};

const RX_CHUNK_SIZE: usize = 64;

pub struct UsbLineTransport<'a, B: UsbBus> {
    serial: SerialPort<'a, B>,
    usb_dev: UsbDevice<'a, B>,
    rx: [u8; RX_CHUNK_SIZE],
    rx_len: usize,
    rx_pos: usize,
}

impl<'a, B: UsbBus> UsbLineTransport<'a, B> {
    /// Create the CDC-ACM class and the device on `bus`, enumerating as a
    /// COMfiltrat0r with the given product id and serial number.
    pub fn open(
        bus: &'a UsbBusAllocator<B>,
        pid: u16,
        serial_number: &'static str,
    ) -> Result<Self, BuilderError> {
        let serial = SerialPort::new(bus);
        let usb_dev = UsbDeviceBuilder::new(bus, UsbVidPid(USB_VID, pid))
            .strings(&[StringDescriptors::default()
                .manufacturer(USB_MANUFACTURER)
                .product(USB_PRODUCT)
                .serial_number(serial_number)])?
            .device_class(usbd_serial::USB_CLASS_CDC)
            .build();
        Ok(Self::new(serial, usb_dev))
    }

    pub fn new(serial: SerialPort<'a, B>, usb_dev: UsbDevice<'a, B>) -> Self {
        Self {
            serial,
            usb_dev,
            rx: [0u8; RX_CHUNK_SIZE],
            rx_len: 0,
            rx_pos: 0,
        }
    }

    /// Poll USB device. Must be called frequently.
    pub fn poll(&mut self) -> bool {
        self.usb_dev.poll(&mut [&mut self.serial])
    }

    /// Block until at least one byte is buffered.
    fn fill(&mut self) -> Result<(), UsbError> {
        loop {
            self.poll();
            match self.serial.read(&mut self.rx) {
                Ok(count) if count > 0 => {
                    self.rx_len = count;
                    self.rx_pos = 0;
                    return Ok(());
                }
                Ok(_) | Err(UsbError::WouldBlock) => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn next_byte(&mut self) -> Result<u8, UsbError> {
        if self.rx_pos == self.rx_len {
            self.fill()?;
        }
        let byte = self.rx[self.rx_pos];
        self.rx_pos += 1;
        Ok(byte)
    }
}

impl<B: UsbBus> LineTransport for UsbLineTransport<'_, B> {
    type Error = UsbError;

    fn read_line(&mut self, buf: &mut [u8]) -> Result<usize, LineError<UsbError>> {
        let mut assembler = LineAssembler::new();
        loop {
            let byte = self.next_byte().map_err(LineError::Transport)?;
            if let Some(line) = assembler.push(buf, byte) {
                return line;
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), UsbError> {
        let mut offset = 0;
        while offset < bytes.len() {
            match self.serial.write(&bytes[offset..]) {
                Ok(n) => offset += n,
                Err(UsbError::WouldBlock) => {
                    self.poll();
                }
                Err(e) => return Err(e),
            }
        }
        // The class drains its buffer on the following polls
        Ok(())
    }
}
