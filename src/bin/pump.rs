//! PlantPoint pump-control variant: main entry point.
//!
//! One relay, one hall-effect flow sensor, `ON` / `OFF` / `RESET` text
//! commands on the serial link.  Flow is reported through the log once
//! per measurement window.
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyOutputPin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};

use plantpoint::adapters::log_sink::LogEventSink;
use plantpoint::adapters::time::Clock;
use plantpoint::adapters::uart::UartLink;
use plantpoint::config::{EdgeSensing, SystemConfig};
use plantpoint::drivers::hw_init;
use plantpoint::pins::{FLOW_PULSE_GPIO, PUMP_RELAY_GPIO};
use plantpoint::pump::PumpController;
use plantpoint::sensors::flow::{PolledEdgeDetector, FLOW_EDGES};

/// Loop period.  Also the sampling period of the polled edge detector.
const LOOP_DELAY_MS: u32 = 1;

fn main() -> Result<()> {
    esp_idf_sys::link_patches();
    esp_idf_logger::init()?;

    info!("PlantPoint pump v{}", env!("CARGO_PKG_VERSION"));

    let config = SystemConfig::default();
    config.validate()?;

    let peripherals = Peripherals::take()?;
    let mut link = UartLink::open(peripherals.uart1, config.controller.baud_rate)?;

    // SAFETY: the relay GPIO is wired to nothing else on the pump board.
    let relay_pin = PinDriver::output(unsafe { AnyOutputPin::new(PUMP_RELAY_GPIO) })?;

    let mut polled = match config.flow.sensing {
        EdgeSensing::Interrupt => match hw_init::init_flow_isr(FLOW_PULSE_GPIO) {
            Ok(()) => None,
            Err(e) => {
                warn!("flow ISR unavailable ({}), falling back to polling", e);
                Some(polled_detector()?)
            }
        },
        EdgeSensing::Polled => Some(polled_detector()?),
    };

    let clock = Clock::new();
    let mut sink = LogEventSink::new();
    let mut pump = PumpController::new(relay_pin, &FLOW_EDGES, &config.flow, clock.now_ms());

    info!(
        "Pump ready (K={} Hz per L/min, {} pulses/L, {:?} sensing).",
        config.flow.k_factor, config.flow.pulses_per_litre, config.flow.sensing
    );

    loop {
        if let Some(detector) = polled.as_mut() {
            detector.sample(hw_init::gpio_read(FLOW_PULSE_GPIO), &FLOW_EDGES);
        }
        pump.poll(&mut link, &mut sink);
        pump.tick(clock.now_ms(), &mut sink);
        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}

fn polled_detector() -> Result<PolledEdgeDetector> {
    hw_init::configure_input(FLOW_PULSE_GPIO, true)?;
    Ok(PolledEdgeDetector::new(hw_init::gpio_read(FLOW_PULSE_GPIO)))
}
