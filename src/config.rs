//! System configuration parameters
//!
//! All tunable parameters for the three PlantPoint images.  Defaults match
//! the values the rig shipped with; `validate()` guards against values that
//! would stall the polling loop or divide by zero.

use serde::{Deserialize, Serialize};

/// What the controller does when a bulk `config` carries more devices than
/// the registry can hold.  Both behaviours exist in the field; the first
/// `MAX_DEVICES` entries are applied either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Reply `ok` with the truncated count (and a `dropped` field).
    #[default]
    Truncate,
    /// Reply with a capacity error after applying what fits.
    Reject,
}

/// How the flow meter detects sensor edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeSensing {
    /// GPIO ISR increments the shared atomic counter.
    #[default]
    Interrupt,
    /// Main loop samples the pin and counts low→high transitions.
    Polled,
}

/// MPINO controller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Telemetry scan interval (milliseconds).
    pub telemetry_interval_ms: u32,
    /// Bulk configuration overflow behaviour.
    pub capacity_policy: CapacityPolicy,
    /// Serial link baud rate.
    pub baud_rate: u32,
}

/// Pump-control variant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Measurement window (milliseconds).
    pub window_ms: u32,
    /// Sensor frequency (Hz) per 1 L/min of flow.
    pub k_factor: f32,
    /// Sensor pulses per litre.
    pub pulses_per_litre: f32,
    /// Edge detection strategy.
    pub sensing: EdgeSensing,
}

/// ESP32 bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Broker URL, e.g. `mqtt://172.30.1.38:1883`.
    pub broker_url: String,
    /// Client-id prefix; the MAC suffix is appended at boot.
    pub client_id_prefix: String,
    /// Keep-alive interval (seconds).
    pub keep_alive_secs: u16,
    /// Topic filter for inbound switch commands.
    pub switch_filter: String,
    /// Required prefix of an inbound `pattern`.
    pub switch_prefix: String,
    /// Topic prefix used inside outbound `pattern` fields.
    pub current_prefix: String,
    /// Fixed topic for outbound telemetry.
    pub current_topic: String,
    /// Publish on `current/<dev>` instead of the fixed topic.
    pub per_device_topics: bool,
    /// Topic prefix for environment samples (`<prefix>/<name>`).
    pub environment_prefix: String,
    /// Retained online/offline status topic (also the last-will topic).
    pub status_topic: String,
    /// Consecutive failed connects before the board restarts.
    pub max_reconnect_attempts: u32,
    /// First reconnect delay; doubles per attempt.
    pub reconnect_base_secs: u32,
    /// Reconnect delay ceiling.
    pub reconnect_max_secs: u32,
    /// Serial link baud rate.
    pub baud_rate: u32,
}

/// Core system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    pub controller: ControllerConfig,
    pub flow: FlowConfig,
    pub bridge: BridgeConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            telemetry_interval_ms: 2000,
            capacity_policy: CapacityPolicy::Truncate,
            baud_rate: 115_200,
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            window_ms: 1000,
            // 5160 pulses/L → 86 Hz at 1 L/min.
            k_factor: 86.0,
            pulses_per_litre: 5160.0,
            sensing: EdgeSensing::Interrupt,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            broker_url: "mqtt://172.30.1.38:1883".into(),
            client_id_prefix: "mpino_bridge".into(),
            keep_alive_secs: 60,
            switch_filter: "switch/+".into(),
            switch_prefix: "switch/".into(),
            current_prefix: "current".into(),
            current_topic: "current".into(),
            per_device_topics: false,
            environment_prefix: "environment".into(),
            status_topic: "status/mpino_bridge".into(),
            max_reconnect_attempts: 10,
            reconnect_base_secs: 2,
            reconnect_max_secs: 60,
            baud_rate: 115_200,
        }
    }
}

/// Errors from [`SystemConfig::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl SystemConfig {
    /// Reject values that cannot work.  Values are never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.controller;
        if !(100..=60_000).contains(&c.telemetry_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "controller.telemetry_interval_ms must be 100..=60000",
            ));
        }
        if c.baud_rate == 0 || self.bridge.baud_rate == 0 {
            return Err(ConfigError::ValidationFailed("baud_rate must be non-zero"));
        }

        let f = &self.flow;
        if f.window_ms == 0 {
            return Err(ConfigError::ValidationFailed("flow.window_ms must be non-zero"));
        }
        if !(f.k_factor > 0.0) || !(f.pulses_per_litre > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "flow calibration constants must be positive",
            ));
        }

        let b = &self.bridge;
        if b.broker_url.is_empty() {
            return Err(ConfigError::ValidationFailed("bridge.broker_url is empty"));
        }
        if b.switch_prefix.is_empty() || !b.switch_prefix.ends_with('/') {
            return Err(ConfigError::ValidationFailed(
                "bridge.switch_prefix must end with '/'",
            ));
        }
        if b.current_topic.is_empty()
            || b.status_topic.is_empty()
            || b.environment_prefix.is_empty()
        {
            return Err(ConfigError::ValidationFailed("bridge topics must not be empty"));
        }
        if b.max_reconnect_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "bridge.max_reconnect_attempts must be non-zero",
            ));
        }
        if b.reconnect_base_secs == 0 || b.reconnect_base_secs > b.reconnect_max_secs {
            return Err(ConfigError::ValidationFailed(
                "bridge reconnect backoff must satisfy 0 < base <= max",
            ));
        }
        Ok(())
    }
}
