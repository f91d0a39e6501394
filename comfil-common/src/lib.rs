// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Common types and logic for the COMfiltrat0r firmwares and host tool.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode, hardware independent, testable on the host
//! - `std` feature: chunk encoding helpers for the host sender
//! - `embedded` feature: USB CDC line transport and defmt outcome reporting

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate alloc;

pub mod config;
pub mod handler;
pub mod protocol;
pub mod record_store;
pub mod signal;
pub mod state;
pub mod storage;

#[cfg(feature = "embedded")]
pub mod usb_serial;

// Re-export commonly used types
pub use handler::{ChunkError, Device, MountFault, Outcome};
pub use protocol::{Ack, FrameError, Line, BANNER, DELIMITER};
pub use signal::{blink, Readiness};
pub use state::{DeviceState, SignalLevel};
pub use storage::{LineError, LineTransport, OpenMode, Storage};

/// Log the outcome of one protocol step over defmt.
#[cfg(feature = "embedded")]
pub fn report<E: core::fmt::Debug, T: core::fmt::Debug>(step: &Result<Outcome<E>, T>) {
    match step {
        Ok(Outcome::Probe) => defmt::debug!("probe answered"),
        Ok(Outcome::Appended {
            filename,
            bytes,
            created,
        }) => defmt::info!(
            "{=str} {=str}: {=usize} bytes",
            if *created { "created" } else { "appended" },
            filename.as_str(),
            bytes
        ),
        Ok(Outcome::Dropped(e)) => {
            defmt::error!("chunk dropped: {}", defmt::Debug2Format(e))
        }
        Ok(Outcome::Discarded) => defmt::warn!("line too long, discarded"),
        Err(e) => defmt::warn!("transport error: {}", defmt::Debug2Format(e)),
    }
}
