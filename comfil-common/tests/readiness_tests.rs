// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the device state and its readiness signal projection.

mod common;

use comfil_common::config::FAULT_BLINK_HALF_PERIOD_MS;
use comfil_common::signal::{blink, Readiness};
use comfil_common::state::{DeviceState, SignalLevel};

use common::{FakeDelay, FakePin};

// =============================================================================
// Projection
// =============================================================================

#[test]
fn test_ready_is_steady_on() {
    assert_eq!(DeviceState::Ready.signal(), SignalLevel::On);
}

#[test]
fn test_receiving_is_off() {
    assert_eq!(DeviceState::Receiving.signal(), SignalLevel::Off);
}

#[test]
fn test_initializing_is_off() {
    assert_eq!(DeviceState::Initializing.signal(), SignalLevel::Off);
}

#[test]
fn test_storage_fault_blinks_at_250ms() {
    assert_eq!(FAULT_BLINK_HALF_PERIOD_MS, 250);
    assert_eq!(
        DeviceState::StorageFault.signal(),
        SignalLevel::Blink {
            half_period_ms: 250
        }
    );
}

#[test]
fn test_after_mount() {
    assert_eq!(DeviceState::after_mount(true), DeviceState::Ready);
    assert_eq!(DeviceState::after_mount(false), DeviceState::StorageFault);
}

#[test]
fn test_only_ready_accepts_input() {
    assert!(DeviceState::Ready.accepts_input());
    assert!(!DeviceState::Initializing.accepts_input());
    assert!(!DeviceState::Receiving.accepts_input());
    assert!(!DeviceState::StorageFault.accepts_input());
}

// =============================================================================
// Readiness
// =============================================================================

#[test]
fn test_new_starts_initializing_with_signal_off() {
    let pin = FakePin::default();
    let readiness = Readiness::new(pin.clone());
    assert_eq!(readiness.state(), DeviceState::Initializing);
    assert_eq!(pin.history(), vec![false]);
}

#[test]
fn test_ready_starts_with_signal_on() {
    let pin = FakePin::default();
    let readiness = Readiness::ready(pin.clone());
    assert_eq!(readiness.state(), DeviceState::Ready);
    assert_eq!(pin.last(), Some(true));
}

#[test]
fn test_enter_drives_pin_from_state() {
    let pin = FakePin::default();
    let mut readiness = Readiness::new(pin.clone());
    readiness.enter(DeviceState::Ready);
    readiness.enter(DeviceState::Receiving);
    readiness.enter(DeviceState::Ready);
    assert_eq!(pin.history(), vec![false, true, false, true]);
    assert_eq!(readiness.state(), DeviceState::Ready);
}

#[test]
fn test_blink_cycles_in_fault() {
    let pin = FakePin::default();
    let mut delay = FakeDelay::default();
    let mut readiness = Readiness::new(pin.clone());
    readiness.enter(DeviceState::StorageFault);
    pin.clear();

    readiness.blink_cycles(&mut delay, 3);

    assert_eq!(pin.history(), vec![true, false, true, false, true, false]);
    assert_eq!(delay.delays_ms, vec![250; 6]);
}

#[test]
fn test_blink_cycles_outside_fault_does_nothing() {
    let pin = FakePin::default();
    let mut delay = FakeDelay::default();
    let mut readiness = Readiness::ready(pin.clone());
    pin.clear();

    readiness.blink_cycles(&mut delay, 3);

    assert!(pin.history().is_empty());
    assert!(delay.delays_ms.is_empty());
}

#[test]
fn test_blink_helper() {
    let mut pin = FakePin::default();
    let mut delay = FakeDelay::default();
    blink(&mut pin, &mut delay, 2, 100);
    assert_eq!(pin.history(), vec![true, false, true, false]);
    assert_eq!(delay.delays_ms, vec![100; 4]);
}

#[test]
fn test_release_returns_pin() {
    let pin = FakePin::default();
    let readiness = Readiness::ready(pin.clone());
    let released = readiness.release();
    assert_eq!(released.last(), Some(true));
}
