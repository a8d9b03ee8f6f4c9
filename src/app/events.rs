//! Outbound application events.
//!
//! The controller, pump and bridge cores emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them; in the firmware images they become
//! log lines.

use crate::error::ProtocolError;
use crate::registry::{DeviceName, Reading};
use crate::sensors::flow::FlowReading;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller came up and announced itself on the link.
    Started,

    /// A bulk `config` was applied.
    Configured {
        applied: usize,
        dropped: usize,
        duplicates: usize,
        /// Entries refused for an overlong name.
        rejected: usize,
    },

    /// `config_start` cleared the registry.
    ConfigStarted,

    /// `config_device` wrote one slot.
    DeviceWritten { index: usize, name: DeviceName },

    /// `config_end` closed a streamed configuration.
    ConfigEnded { count: usize },

    /// A machine's relay was driven.
    Switched { name: DeviceName, on: bool },

    /// A frame was answered with an error reply.
    Rejected(ProtocolError),

    /// One telemetry scan emitted `count` frames.
    TelemetrySent { count: usize },

    /// The flow meter closed a measurement window.
    FlowWindow(FlowReading),

    /// The pump relay changed state on a text command.
    PumpSwitched(bool),

    /// Accumulated volume was zeroed.
    VolumeReset,

    /// A topic message became a serial `switch` line.
    BridgeForwarded { name: DeviceName, on: bool },

    /// Serial telemetry was published to the broker.
    BridgePublished { name: DeviceName, reading: Reading },

    /// An environment sample was published to the broker.
    EnvironmentPublished { name: DeviceName },

    /// An inbound message or serial line was dropped.
    BridgeDropped(&'static str),
}
