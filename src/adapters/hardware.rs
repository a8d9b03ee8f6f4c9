//! Hardware adapter: bridges runtime-numbered GPIOs to [`PinPort`].
//!
//! This is the only module on the controller that touches actual
//! hardware.  On non-espidf targets the underlying `hw_init` helpers are
//! simulation stubs.

use log::warn;

use crate::app::ports::PinPort;
use crate::drivers::hw_init;
use crate::pins::MAX_GPIO;
use crate::registry::Pin;

/// GPIO / ADC access by pin number.
#[derive(Debug, Default)]
pub struct GpioPins {
    /// Pins whose ADC channel has been set up, one bit per GPIO.
    analog_ready: u64,
}

impl GpioPins {
    pub fn new() -> Self {
        Self::default()
    }

    fn valid(pin: Pin) -> bool {
        if pin > MAX_GPIO {
            warn!("hw: GPIO{} does not exist", pin);
            return false;
        }
        true
    }
}

impl PinPort for GpioPins {
    fn configure_output(&mut self, pin: Pin, high: bool) {
        if !Self::valid(pin) {
            return;
        }
        if let Err(e) = hw_init::configure_output(i32::from(pin), high) {
            warn!("hw: output GPIO{}: {}", pin, e);
        }
    }

    fn configure_input(&mut self, pin: Pin, pull_up: bool) {
        if !Self::valid(pin) {
            return;
        }
        // A reconfigured pin may change role; set the ADC up again on demand.
        self.analog_ready &= !(1u64 << pin);
        if let Err(e) = hw_init::configure_input(i32::from(pin), pull_up) {
            warn!("hw: input GPIO{}: {}", pin, e);
        }
    }

    fn write(&mut self, pin: Pin, high: bool) {
        if Self::valid(pin) {
            hw_init::gpio_write(i32::from(pin), high);
        }
    }

    fn read_digital(&mut self, pin: Pin) -> bool {
        Self::valid(pin) && hw_init::gpio_read(i32::from(pin))
    }

    fn read_analog(&mut self, pin: Pin) -> u16 {
        if !Self::valid(pin) {
            return 0;
        }
        let bit = 1u64 << pin;
        if self.analog_ready & bit == 0 {
            match hw_init::configure_analog(i32::from(pin)) {
                Ok(()) => self.analog_ready |= bit,
                Err(e) => {
                    warn!("hw: analog GPIO{}: {}", pin, e);
                    return 0;
                }
            }
        }
        hw_init::adc_read_pin(i32::from(pin))
    }
}
