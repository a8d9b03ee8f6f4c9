//! PlantPoint ESP32 MQTT bridge: main entry point.
//!
//! ```text
//!  broker ⇄ MqttLink ──callback──▶ SERIAL_TX ──▶ UartLink ──▶ MPINO
//!                    ◀── Bridge::poll_serial ◀── UartLink ◀──
//! ```
//!
//! The MQTT task forwards switch commands into the serial queue on its
//! own; the main loop drains that queue, relays controller telemetry to
//! the broker and runs the reconnect policy.
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{error, info, warn};

use plantpoint::adapters::log_sink::LogEventSink;
use plantpoint::adapters::mqtt::MqttLink;
use plantpoint::adapters::time::Clock;
use plantpoint::adapters::uart::UartLink;
use plantpoint::adapters::wifi;
use plantpoint::bridge::queue::SERIAL_TX;
use plantpoint::bridge::reconnect::{ReconnectAction, ReconnectPolicy};
use plantpoint::bridge::Bridge;
use plantpoint::config::SystemConfig;

const LOOP_DELAY_MS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_sys::link_patches();
    esp_idf_logger::init()?;

    info!("PlantPoint bridge v{}", env!("CARGO_PKG_VERSION"));

    let config = SystemConfig::default();
    config.validate()?;

    // ── 2. Network ────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take().ok();

    let (ssid, password) = wifi::build_credentials();
    let _wifi = wifi::connect_station(ssid, password, peripherals.modem, sysloop, nvs)?;

    // ── 3. Serial link + bridge core ──────────────────────────
    let mut uart = UartLink::open(peripherals.uart1, config.bridge.baud_rate)?;
    let mut bridge = Bridge::new(config.bridge.clone(), &SERIAL_TX);
    let mut mqtt = MqttLink::new(&config.bridge, bridge.forwarder());
    let mut policy = ReconnectPolicy::from_config(&config.bridge);
    let mut sink = LogEventSink::new();
    let clock = Clock::new();

    // A failed first attempt is picked up by the loop as a lost session.
    let _ = mqtt.connect();
    let mut retry_at: Option<u32> = None;

    info!("Bridge ready. Entering main loop.");

    // ── 4. Main loop ──────────────────────────────────────────
    loop {
        let now = clock.now_ms();

        if mqtt.take_session_started() {
            policy.on_success();
            if let Err(e) = bridge.on_connected(&mut mqtt) {
                warn!("bridge: session setup failed: {}", e);
            }
        }

        if mqtt.take_lost() && retry_at.is_none() {
            mqtt.disconnect();
            match policy.on_failure() {
                ReconnectAction::RetryAfter(delay) => {
                    warn!(
                        "bridge: broker session lost ({} in a row), retry in {:?}",
                        policy.failures(),
                        delay
                    );
                    retry_at = Some(now.wrapping_add(delay.as_millis() as u32));
                }
                ReconnectAction::Restart => {
                    error!(
                        "bridge: {} consecutive broker failures, restarting",
                        policy.failures()
                    );
                    esp_idf_hal::reset::restart();
                }
            }
        }

        if let Some(at) = retry_at {
            if now.wrapping_sub(at) as i32 >= 0 {
                retry_at = None;
                let _ = mqtt.connect();
            }
        }

        bridge.drain_tx(&mut uart);
        bridge.poll_serial(&mut uart, &mut mqtt, &mut sink);
        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}
