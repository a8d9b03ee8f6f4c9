//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller / Bridge / PumpController
//! ```
//!
//! Driven adapters (GPIO, event sinks, the MQTT client) implement these
//! traits.  The domain types consume them via generics, so the registry,
//! dispatcher and scanner never touch hardware directly and run unchanged
//! against the recording mocks in `tests/integration/mock_hw.rs`.

use crate::registry::Pin;

// ───────────────────────────────────────────────────────────────
// Pin port (driven adapter: domain ↔ GPIO / ADC)
// ───────────────────────────────────────────────────────────────

/// Dynamic pin access for runtime-configured devices.
///
/// The controller learns its pin map over the wire, so it cannot hold
/// typed `embedded-hal` pins; it addresses GPIOs by number instead.
pub trait PinPort {
    /// Configure `pin` as a push-pull output and drive it to `high`.
    fn configure_output(&mut self, pin: Pin, high: bool);

    /// Configure `pin` as an input, optionally with the internal pull-up.
    fn configure_input(&mut self, pin: Pin, pull_up: bool);

    /// Drive an output pin.
    fn write(&mut self, pin: Pin, high: bool);

    /// Digital level of an input pin.
    fn read_digital(&mut self, pin: Pin) -> bool;

    /// Raw ADC reading of an analog-capable input pin.
    fn read_analog(&mut self, pin: Pin) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, test
/// recorder, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Sink that drops everything; used where no observer is wired.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &super::events::AppEvent) {}
}

// ───────────────────────────────────────────────────────────────
// Pub/sub port (driven adapter: bridge ↔ MQTT broker)
// ───────────────────────────────────────────────────────────────

/// Topic-based publish/subscribe transport.
///
/// Session management (connect, keep-alive, last-will) lives in the
/// adapter; the bridge only publishes and (re)subscribes.
pub trait PubSubPort {
    /// Publish `payload` on `topic`.
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), PubSubError>;

    /// Subscribe to a topic filter (may contain `+` / `#`).
    fn subscribe(&mut self, filter: &str) -> Result<(), PubSubError>;

    /// Whether the session is currently up.
    fn is_connected(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`PubSubPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PubSubError {
    /// No broker session.
    NotConnected,
    /// The client refused or failed the publish.
    PublishFailed,
    /// The client refused or failed the subscribe.
    SubscribeFailed,
}

impl core::fmt::Display for PubSubError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
        }
    }
}

impl From<PubSubError> for crate::error::CommsError {
    fn from(e: PubSubError) -> Self {
        match e {
            PubSubError::NotConnected => Self::MqttConnectFailed,
            PubSubError::PublishFailed => Self::MqttPublishFailed,
            PubSubError::SubscribeFailed => Self::MqttSubscribeFailed,
        }
    }
}
