//! PlantPoint MPINO controller: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 Adapters (outer ring)                    │
//! │   UartLink (Transport)   GpioPins (PinPort)              │
//! │   LogEventSink (EventSink)   Clock                       │
//! │  ─────────────── Port trait boundary ──────────────────  │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │   Controller: LineAssembler · Registry · Scanner   │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Single cooperative loop: drain the link, answer commands, then let the
//! telemetry scanner report changed devices once per interval.
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};

use plantpoint::adapters::hardware::GpioPins;
use plantpoint::adapters::log_sink::LogEventSink;
use plantpoint::adapters::time::Clock;
use plantpoint::adapters::uart::UartLink;
use plantpoint::app::service::Controller;
use plantpoint::config::SystemConfig;
use plantpoint::drivers::hw_init;

/// Idle time per loop pass; keeps the idle task fed.
const LOOP_DELAY_MS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_sys::link_patches();
    esp_idf_logger::init()?;

    info!("PlantPoint controller v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Config ─────────────────────────────────────────────
    let config = SystemConfig::default();
    config.validate()?;

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    if let Err(e) = hw_init::init_adc() {
        warn!("ADC unavailable ({}), analog sensors will read 0", e);
    }
    let mut link = UartLink::open(peripherals.uart1, config.controller.baud_rate)?;

    // ── 4. Adapters + core ────────────────────────────────────
    let clock = Clock::new();
    let mut pins = GpioPins::new();
    let mut sink = LogEventSink::new();
    let mut controller = Controller::new(&config.controller, clock.now_ms());

    controller.start(&mut link, &mut sink);
    info!("Controller ready. Entering main loop.");

    // ── 5. Main loop ──────────────────────────────────────────
    loop {
        controller.poll(&mut link, &mut pins, &mut sink);
        controller.tick(clock.now_ms(), &mut pins, &mut link, &mut sink);
        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}
