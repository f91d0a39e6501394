// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Device state and its projection onto the readiness signal.
//!
//! The signal line carries no state of its own: whatever the LED shows is
//! computed from the current [`DeviceState`] by [`DeviceState::signal`].

use crate::config::FAULT_BLINK_HALF_PERIOD_MS;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Storage not mounted yet (removable storage only).
    Initializing,
    /// Idle, waiting for the next line.
    Ready,
    /// Busy appending a chunk.
    Receiving,
    /// Storage mount failed. Terminal.
    StorageFault,
}

/// What the readiness signal shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalLevel {
    On,
    Off,
    Blink { half_period_ms: u32 },
}

impl DeviceState {
    pub const fn signal(self) -> SignalLevel {
        match self {
            DeviceState::Initializing | DeviceState::Receiving => SignalLevel::Off,
            DeviceState::Ready => SignalLevel::On,
            DeviceState::StorageFault => SignalLevel::Blink {
                half_period_ms: FAULT_BLINK_HALF_PERIOD_MS,
            },
        }
    }

    /// State reached once the storage mount attempt finished.
    pub const fn after_mount(mounted: bool) -> Self {
        if mounted {
            DeviceState::Ready
        } else {
            DeviceState::StorageFault
        }
    }

    /// Whether protocol input may be read in this state.
    pub const fn accepts_input(self) -> bool {
        matches!(self, DeviceState::Ready)
    }
}
