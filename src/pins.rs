//! GPIO / peripheral pin assignments for the PlantPoint boards.
//!
//! Relay and sense pins for the MPINO controller are *not* listed here:
//! they arrive at runtime through `config` / `config_device` commands.
//! This table only covers the fixed wiring of each image.

// ---------------------------------------------------------------------------
// Serial link (MPINO <-> ESP32 bridge)
// ---------------------------------------------------------------------------

/// UART1 pins for the line protocol on every image.
pub const LINK_UART_TX_GPIO: i32 = 17;
pub const LINK_UART_RX_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// Pump-control variant
// ---------------------------------------------------------------------------

/// Digital output: pump relay coil (HIGH = energised).
pub const PUMP_RELAY_GPIO: i32 = 4;

/// Hall-effect flow sensor: pulse output.  Interrupt capable on the
/// pump board; the polled detector is used when it is not.
pub const FLOW_PULSE_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// Controller limits
// ---------------------------------------------------------------------------

/// Highest GPIO number the controller accepts from a configuration
/// command.  ESP32-S3 exposes GPIO 0–48.
pub const MAX_GPIO: u8 = 48;
