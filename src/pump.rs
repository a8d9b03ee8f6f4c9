//! Pump-control variant: one relay, one flow meter, plain-text commands.
//!
//! Commands arrive one per line on the serial link:
//!
//! | line    | effect                                       |
//! |---------|----------------------------------------------|
//! | `ON`    | energise the pump relay                      |
//! | `OFF`   | release the pump relay                       |
//! | `RESET` | zero accumulated volume (relay untouched)    |
//!
//! Matching ignores case and surrounding whitespace.  There are no
//! structured replies; everything is reported through the event sink.

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::config::FlowConfig;
use crate::drivers::relay::RelayDriver;
use crate::protocol::codec::LineAssembler;
use crate::protocol::transport::Transport;
use crate::sensors::flow::{EdgeCounter, FlowReading, PulseFlowMeter};

/// Text commands are single words; anything longer is garbage anyway.
pub const PUMP_LINE_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpCommand {
    On,
    Off,
    Reset,
}

impl PumpCommand {
    pub fn parse(line: &[u8]) -> Option<Self> {
        let word = line.trim_ascii();
        if word.eq_ignore_ascii_case(b"ON") {
            Some(Self::On)
        } else if word.eq_ignore_ascii_case(b"OFF") {
            Some(Self::Off)
        } else if word.eq_ignore_ascii_case(b"RESET") {
            Some(Self::Reset)
        } else {
            None
        }
    }
}

pub struct PumpController<'a, P: OutputPin> {
    relay: RelayDriver<P>,
    meter: PulseFlowMeter<'a>,
    assembler: LineAssembler<PUMP_LINE_CAPACITY>,
}

impl<'a, P: OutputPin> PumpController<'a, P> {
    pub fn new(relay_pin: P, counter: &'a EdgeCounter, config: &FlowConfig, now_ms: u32) -> Self {
        Self {
            relay: RelayDriver::new(relay_pin),
            meter: PulseFlowMeter::new(counter, config, now_ms),
            assembler: LineAssembler::new(),
        }
    }

    /// Drain the link and act on every complete line, in arrival order.
    pub fn poll<T: Transport>(&mut self, link: &mut T, sink: &mut impl EventSink) {
        let Self {
            relay,
            meter,
            assembler,
        } = self;
        let mut buf = [0u8; 64];
        loop {
            let n = match link.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!("pump: link read failed: {:?}", e);
                    break;
                }
            };
            assembler.feed(&buf[..n], |line| match PumpCommand::parse(line) {
                Some(cmd) => apply(&mut *relay, &mut *meter, cmd, &mut *sink),
                None => warn!(
                    "pump: unknown command '{}'",
                    core::str::from_utf8(line).unwrap_or("<binary>").trim()
                ),
            });
        }
    }

    pub fn handle(&mut self, cmd: PumpCommand, sink: &mut impl EventSink) {
        apply(&mut self.relay, &mut self.meter, cmd, sink);
    }

    /// Close the flow window if due and report it.
    pub fn tick(&mut self, now_ms: u32, sink: &mut impl EventSink) -> Option<FlowReading> {
        let reading = self.meter.tick(now_ms)?;
        sink.emit(&AppEvent::FlowWindow(reading));
        Some(reading)
    }

    pub fn is_pump_on(&self) -> bool {
        self.relay.is_on()
    }

    pub fn total_litres(&self) -> f64 {
        self.meter.total_litres()
    }

    pub fn flow_lpm(&self) -> f32 {
        self.meter.flow_lpm()
    }
}

fn apply<P: OutputPin>(
    relay: &mut RelayDriver<P>,
    meter: &mut PulseFlowMeter<'_>,
    cmd: PumpCommand,
    sink: &mut impl EventSink,
) {
    match cmd {
        PumpCommand::On | PumpCommand::Off => {
            let on = cmd == PumpCommand::On;
            relay.set(on);
            info!("pump: relay {}", if on { "ON" } else { "OFF" });
            sink.emit(&AppEvent::PumpSwitched(on));
        }
        PumpCommand::Reset => {
            meter.reset_total();
            info!("pump: total volume reset");
            sink.emit(&AppEvent::VolumeReset);
        }
    }
}
