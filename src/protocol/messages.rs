//! Wire messages of the serial JSON protocol.
//!
//! Inbound frames decode into the closed [`Command`] enum in one step:
//! the `cmd` tag is checked first so that an unknown tag and a malformed
//! argument produce different replies, then the arguments of the matched
//! command are deserialised into typed fields.
//!
//! Outbound traffic is either a [`Reply`] (exactly one per inbound frame)
//! or unsolicited [`Telemetry`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;
use crate::registry::{DeviceSpec, Reading};

// ───────────────────────────────────────────────────────────────
// Inbound
// ───────────────────────────────────────────────────────────────

/// A decoded host command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Replace the whole registry.
    Config(Vec<DeviceSpec>),
    /// Clear the registry ahead of a streamed configuration.
    ConfigStart,
    /// Write one registry slot.  The index is kept signed so that a
    /// negative value is reported as out of range, not as a parse error.
    ConfigDevice { index: i64, spec: DeviceSpec },
    /// Close a streamed configuration.
    ConfigEnd,
    /// Drive a machine's relay.
    Switch { dev: String, val: bool },
}

#[derive(Deserialize)]
struct IndexArg {
    index: i64,
}

#[derive(Deserialize)]
struct SwitchArgs {
    dev: String,
    val: bool,
}

impl Command {
    /// Decode one assembled frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let text = core::str::from_utf8(frame.trim_ascii())
            .map_err(|_| ProtocolError::UnsupportedFormat)?;
        if !text.starts_with('{') {
            return Err(ProtocolError::UnsupportedFormat);
        }

        let value: Value = serde_json::from_str(text)?;
        let cmd = value
            .get("cmd")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingCmd)?;

        match cmd {
            "config" => {
                let devices = value
                    .get("devices")
                    .filter(|d| d.is_array())
                    .ok_or(ProtocolError::MissingDevices)?;
                Ok(Self::Config(Vec::<DeviceSpec>::deserialize(devices)?))
            }
            "config_start" => Ok(Self::ConfigStart),
            "config_device" => {
                let IndexArg { index } = IndexArg::deserialize(&value)?;
                let spec = DeviceSpec::deserialize(&value)?;
                Ok(Self::ConfigDevice { index, spec })
            }
            "config_end" => Ok(Self::ConfigEnd),
            "switch" => {
                let SwitchArgs { dev, val } = SwitchArgs::deserialize(&value)?;
                Ok(Self::Switch { dev, val })
            }
            other => Err(ProtocolError::UnknownCommand(other.into())),
        }
    }

    /// Wire tag, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::ConfigStart => "config_start",
            Self::ConfigDevice { .. } => "config_device",
            Self::ConfigEnd => "config_end",
            Self::Switch { .. } => "switch",
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Replies
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// The one reply every inbound frame gets.  Absent fields are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropped: Option<usize>,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            message: None,
            device: None,
            index: None,
            count: None,
            value: None,
            dropped: None,
        }
    }

    pub fn error(err: &ProtocolError) -> Self {
        Self {
            status: Status::Error,
            message: Some(err.to_string()),
            ..Self::ok()
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_device(mut self, device: &str) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_value(mut self, value: bool) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_dropped(mut self, dropped: usize) -> Self {
        self.dropped = Some(dropped);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

// ───────────────────────────────────────────────────────────────
// Unsolicited telemetry
// ───────────────────────────────────────────────────────────────

/// Frames the controller sends without being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Telemetry<'a> {
    /// A device's sense reading changed (or was never sent).
    Current { dev: &'a str, val: Reading },
    /// Boot finished; sent once.
    InitComplete { status: &'a str },
}
