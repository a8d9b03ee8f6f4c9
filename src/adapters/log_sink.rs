//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to the console UART in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::registry::Reading;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

fn reading_text(r: &Reading) -> String {
    match r {
        Reading::Digital(on) => String::from(if *on { "ON" } else { "OFF" }),
        Reading::Analog(raw) => raw.to_string(),
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => info!("START | init_complete sent"),
            AppEvent::Configured {
                applied,
                dropped,
                duplicates,
                rejected,
            } => {
                if *dropped > 0 || *duplicates > 0 || *rejected > 0 {
                    warn!(
                        "CONFIG | applied={} dropped={} duplicates={} rejected={}",
                        applied, dropped, duplicates, rejected
                    );
                } else {
                    info!("CONFIG | applied={}", applied);
                }
            }
            AppEvent::ConfigStarted => info!("CONFIG | streamed start, registry cleared"),
            AppEvent::DeviceWritten { index, name } => {
                info!("CONFIG | slot {} = {}", index, name);
            }
            AppEvent::ConfigEnded { count } => info!("CONFIG | streamed end, count={}", count),
            AppEvent::Switched { name, on } => {
                info!("SWITCH | {} -> {}", name, if *on { "ON" } else { "OFF" });
            }
            AppEvent::Rejected(err) => warn!("REJECT | {}", err),
            AppEvent::TelemetrySent { count } => info!("TELEM | {} changed", count),
            AppEvent::FlowWindow(r) => {
                info!(
                    "FLOW | {:.2} L/min | total={:.3} L | pulses={} in {} ms",
                    r.flow_lpm, r.total_litres, r.pulses, r.elapsed_ms
                );
            }
            AppEvent::PumpSwitched(on) => info!("PUMP | {}", if *on { "ON" } else { "OFF" }),
            AppEvent::VolumeReset => info!("PUMP | total volume reset"),
            AppEvent::BridgeForwarded { name, on } => {
                info!("MQTT>SER | switch {} = {}", name, on);
            }
            AppEvent::BridgePublished { name, reading } => {
                info!("SER>MQTT | {} = {}", name, reading_text(reading));
            }
            AppEvent::EnvironmentPublished { name } => info!("SER>MQTT | environment {}", name),
            AppEvent::BridgeDropped(reason) => warn!("DROP | {}", reason),
        }
    }
}
