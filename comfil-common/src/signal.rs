// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Readiness signal: one output pin driven from the device state.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::state::{DeviceState, SignalLevel};

/// Blink an LED a specified number of times.
pub fn blink(led: &mut impl OutputPin, timer: &mut impl DelayNs, count: u32, period_ms: u32) {
    for _ in 0..count {
        led.set_high().ok();
        timer.delay_ms(period_ms);
        led.set_low().ok();
        timer.delay_ms(period_ms);
    }
}

/// The device state together with the pin that shows it.
pub struct Readiness<P> {
    state: DeviceState,
    pin: P,
}

impl<P: OutputPin> Readiness<P> {
    /// Start in `Initializing` with the signal off.
    pub fn new(pin: P) -> Self {
        Self::with_state(pin, DeviceState::Initializing)
    }

    /// Start directly in `Ready`, for storage that needs no mount step.
    pub fn ready(pin: P) -> Self {
        Self::with_state(pin, DeviceState::Ready)
    }

    fn with_state(pin: P, state: DeviceState) -> Self {
        let mut readiness = Self { state, pin };
        readiness.enter(state);
        readiness
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Move to `state` and update the pin. A blinking level starts on its
    /// high phase; the blinking itself is done by [`Readiness::halt`].
    pub fn enter(&mut self, state: DeviceState) {
        self.state = state;
        match state.signal() {
            SignalLevel::On | SignalLevel::Blink { .. } => self.pin.set_high().ok(),
            SignalLevel::Off => self.pin.set_low().ok(),
        };
    }

    /// Blink the fault pattern `cycles` times. Does nothing unless the
    /// current state blinks.
    pub fn blink_cycles(&mut self, timer: &mut impl DelayNs, cycles: u32) {
        if let SignalLevel::Blink { half_period_ms } = self.state.signal() {
            blink(&mut self.pin, timer, cycles, half_period_ms);
        }
    }

    /// Show the fault pattern forever.
    pub fn halt(mut self, timer: &mut impl DelayNs) -> ! {
        self.enter(DeviceState::StorageFault);
        loop {
            self.blink_cycles(timer, 1);
        }
    }

    pub fn release(self) -> P {
        self.pin
    }
}
