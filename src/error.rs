//! Unified error types for the PlantPoint firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! top-level loop's error handling uniform.  Protocol errors are the only
//! ones that travel back over the wire: their `Display` text is exactly the
//! `message` of the error reply.

use core::fmt;

use crate::registry::{MAX_DEVICES, NAME_CAPACITY};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A serial frame could not be turned into a command.
    Protocol(ProtocolError),
    /// The device registry refused a write.
    Registry(RegistryError),
    /// A communication subsystem failed.
    Comms(CommsError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

/// Everything that can go wrong between an assembled frame and a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is not UTF-8 or does not open with `{`.
    UnsupportedFormat,
    /// The JSON decoder rejected the frame; carries its diagnostic.
    Parse(String),
    /// No string `cmd` field.
    MissingCmd,
    /// `cmd` named something we do not implement.
    UnknownCommand(String),
    /// `config` without a `devices` array.
    MissingDevices,
    /// `switch` named a device that is not in the registry.
    UnknownDevice(String),
    /// `switch` named a device with no output capability.
    NotAMachine(String),
    /// Bulk configuration overflowed and the capacity policy rejects it.
    TooManyDevices,
    /// Wrapped registry refusal (`config_device`).
    Registry(RegistryError),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat => write!(f, "unsupported format"),
            Self::Parse(diag) => write!(f, "parse error: {diag}"),
            Self::MissingCmd => write!(f, "missing cmd"),
            Self::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            Self::MissingDevices => write!(f, "missing devices array"),
            Self::UnknownDevice(name) => write!(f, "unknown device: {name}"),
            Self::NotAMachine(name) => write!(f, "not a machine: {name}"),
            Self::TooManyDevices => write!(f, "too many devices (max {MAX_DEVICES})"),
            Self::Registry(e) => write!(f, "{e}"),
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Streamed write outside `0..MAX_DEVICES`.
    IndexOutOfRange,
    /// The name is already held by another slot.
    DuplicateName(String),
    /// The name does not fit `NAME_CAPACITY`.
    NameTooLong(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange => write!(f, "index out of range"),
            Self::DuplicateName(name) => write!(f, "duplicate device: {name}"),
            Self::NameTooLong(name) => {
                write!(f, "name too long (max {NAME_CAPACITY} bytes): {name}")
            }
        }
    }
}

impl From<RegistryError> for ProtocolError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    SerialWriteFailed,
    SerialReadFailed,
    MqttConnectFailed,
    MqttPublishFailed,
    MqttSubscribeFailed,
    /// Outbound frame did not fit the encode buffer.
    FrameTooLarge,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerialWriteFailed => write!(f, "serial write failed"),
            Self::SerialReadFailed => write!(f, "serial read failed"),
            Self::MqttConnectFailed => write!(f, "MQTT connect failed"),
            Self::MqttPublishFailed => write!(f, "MQTT publish failed"),
            Self::MqttSubscribeFailed => write!(f, "MQTT subscribe failed"),
            Self::FrameTooLarge => write!(f, "frame too large"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
