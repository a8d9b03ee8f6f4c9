//! Single-coil relay driver (pump-control variant).
//!
//! A dumb actuator: it drives one output pin and remembers what it drove.
//! Generic over `embedded_hal::digital::OutputPin`, so the ESP-IDF
//! `PinDriver` and the host test mocks plug in the same way.
//!
//! Write failures are logged and leave the recorded state unchanged, so
//! `is_on()` never claims a state the coil was not driven to.

use embedded_hal::digital::OutputPin;
use log::warn;

pub struct RelayDriver<P: OutputPin> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> RelayDriver<P> {
    /// Take the pin and drive it low (coil released).
    pub fn new(mut pin: P) -> Self {
        if pin.set_low().is_err() {
            warn!("relay: initial set_low failed");
        }
        Self { pin, on: false }
    }

    pub fn set(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match result {
            Ok(()) => self.on = on,
            Err(e) => warn!("relay: write {} failed: {:?}", on, e),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
