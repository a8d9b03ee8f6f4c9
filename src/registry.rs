//! Device registry.
//!
//! A bounded arena of [`MAX_DEVICES`] slots plus a logical length.  Slot
//! order is the addressing scheme: bulk `config` fills slots in array
//! order, streamed `config_device` names its slot explicitly.
//!
//! ## Invariants
//!
//! - Slots at or beyond `len` are always in their default state.
//! - A non-empty name is held by at most one slot.
//! - Names are stored exactly as configured.  A name longer than
//!   [`NAME_CAPACITY`] is refused rather than cut, so every stored device
//!   stays reachable by the name the host sent.
//! - Every configuration write builds a fresh [`Device`], so the cached
//!   last-reported telemetry value resets in lockstep with the definition.
//!
//! Pin-mode setup is a side effect of configuration and goes through the
//! [`PinPort`] the caller passes in.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::PinPort;
use crate::error::RegistryError;

/// Registry capacity on every controller variant.
pub const MAX_DEVICES: usize = 10;

/// Longest device name accepted, in bytes.
pub const NAME_CAPACITY: usize = 32;

/// Physical GPIO number.  Zero on the wire means "not connected".
pub type Pin = u8;

pub type DeviceName = heapless::String<NAME_CAPACITY>;

/// What a device is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Relay-driven actuator with a digital feedback input.
    #[default]
    Machine,
    /// Input-only device read through the ADC.
    Sensor,
}

/// One sense-pin sample, as reported in telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Digital(bool),
    Analog(u16),
}

/// Device descriptor as it arrives in a configuration command.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct DeviceSpec {
    pub name: String,
    #[serde(default)]
    pub relay: Pin,
    #[serde(default, alias = "current")]
    pub sensor: Pin,
    #[serde(default, rename = "type")]
    pub kind: DeviceKind,
}

impl DeviceSpec {
    pub fn new(name: &str, relay: Pin, sensor: Pin) -> Self {
        Self {
            name: name.into(),
            relay,
            sensor,
            kind: DeviceKind::Machine,
        }
    }

    pub fn sensor_only(name: &str, sensor: Pin) -> Self {
        Self {
            name: name.into(),
            relay: 0,
            sensor,
            kind: DeviceKind::Sensor,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Device
// ───────────────────────────────────────────────────────────────

/// A named logical actuator/sensor bound to up to two pins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Device {
    name: DeviceName,
    relay: Option<Pin>,
    sense: Option<Pin>,
    kind: DeviceKind,
    last_reported: Option<Reading>,
}

impl Device {
    fn from_spec(spec: &DeviceSpec) -> Result<Self, RegistryError> {
        let name = DeviceName::try_from(spec.name.as_str())
            .map_err(|_| RegistryError::NameTooLong(spec.name.clone()))?;
        Ok(Self {
            name,
            relay: pin_from_wire(spec.relay),
            sense: pin_from_wire(spec.sensor),
            kind: spec.kind,
            last_reported: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn relay(&self) -> Option<Pin> {
        self.relay
    }

    pub fn sense(&self) -> Option<Pin> {
        self.sense
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Output-capable: a machine with a relay pin.
    pub fn is_machine(&self) -> bool {
        self.kind == DeviceKind::Machine && self.relay.is_some()
    }

    /// Last value sent in telemetry; `None` until the first emit.
    pub fn last_reported(&self) -> Option<Reading> {
        self.last_reported
    }

    /// True when `reading` has never been sent or differs from the last one.
    pub fn needs_report(&self, reading: Reading) -> bool {
        self.last_reported != Some(reading)
    }

    pub(crate) fn record_report(&mut self, reading: Reading) {
        self.last_reported = Some(reading);
    }

    /// Relay low, sense as input.  Machines get the pull-up so an open
    /// current-sense contact reads high instead of floating.
    fn configure_pins(&self, pins: &mut impl PinPort) {
        if let Some(relay) = self.relay {
            pins.configure_output(relay, false);
        }
        if let Some(sense) = self.sense {
            pins.configure_input(sense, self.kind == DeviceKind::Machine);
        }
    }
}

fn pin_from_wire(pin: Pin) -> Option<Pin> {
    (pin != 0).then_some(pin)
}

/// Copy `name` into bounded storage, cutting at a char boundary.  Only
/// for labels (events, bridge state); the registry never truncates.
pub(crate) fn bounded_name(name: &str) -> DeviceName {
    let mut out = DeviceName::new();
    for ch in name.chars() {
        if out.push(ch).is_err() {
            warn!(
                "registry: name '{}' truncated to {} bytes",
                name, NAME_CAPACITY
            );
            break;
        }
    }
    out
}

// ───────────────────────────────────────────────────────────────
// Bulk apply result
// ───────────────────────────────────────────────────────────────

/// Result of [`Registry::replace_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Every descriptor was applied.
    Complete { applied: usize },
    /// Some descriptors were not applied.  The applied ones are intact.
    Partial {
        applied: usize,
        /// Entries past capacity.
        dropped: usize,
        /// Entries whose name repeated an earlier entry.
        duplicates: usize,
        /// Entries whose name exceeds [`NAME_CAPACITY`].
        rejected: usize,
    },
}

impl ApplyOutcome {
    pub fn applied(&self) -> usize {
        match *self {
            Self::Complete { applied } | Self::Partial { applied, .. } => applied,
        }
    }

    pub fn dropped(&self) -> usize {
        match *self {
            Self::Complete { .. } => 0,
            Self::Partial { dropped, .. } => dropped,
        }
    }

    pub fn duplicates(&self) -> usize {
        match *self {
            Self::Complete { .. } => 0,
            Self::Partial { duplicates, .. } => duplicates,
        }
    }

    pub fn rejected(&self) -> usize {
        match *self {
            Self::Complete { .. } => 0,
            Self::Partial { rejected, .. } => rejected,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Partial { .. })
    }
}

// ───────────────────────────────────────────────────────────────
// Registry
// ───────────────────────────────────────────────────────────────

pub struct Registry {
    slots: [Device; MAX_DEVICES],
    len: usize,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Device::default()),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<&Device> {
        self.slots[..self.len].get(index)
    }

    /// Configured slots in index order, including never-written gaps.
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.slots[..self.len].iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.slots[..self.len].iter_mut()
    }

    /// Look a device up by exact, case-sensitive name.
    pub fn find(&self, name: &str) -> Option<&Device> {
        if name.is_empty() {
            return None;
        }
        self.iter().find(|d| d.name() == name)
    }

    /// Drop every device and every cached telemetry value.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = Device::default();
        }
        self.len = 0;
    }

    /// Replace the whole table with `specs`.
    ///
    /// The table is cleared before the first entry is looked at, so no
    /// state from the previous configuration survives even a partial apply.
    pub fn replace_all(&mut self, specs: &[DeviceSpec], pins: &mut impl PinPort) -> ApplyOutcome {
        self.clear();

        let mut duplicates = 0;
        let mut dropped = 0;
        let mut rejected = 0;
        for (pos, spec) in specs.iter().enumerate() {
            if self.len == MAX_DEVICES {
                dropped = specs.len() - pos;
                warn!(
                    "registry: capacity {} reached, {} entries dropped",
                    MAX_DEVICES, dropped
                );
                break;
            }

            let device = match Device::from_spec(spec) {
                Ok(device) => device,
                Err(e) => {
                    warn!("registry: {}, entry skipped", e);
                    rejected += 1;
                    continue;
                }
            };
            if self.find(device.name()).is_some() {
                warn!("registry: duplicate '{}' skipped", device.name());
                duplicates += 1;
                continue;
            }

            device.configure_pins(pins);
            self.slots[self.len] = device;
            self.len += 1;
        }

        info!("registry: {} devices configured", self.len);
        if dropped == 0 && duplicates == 0 && rejected == 0 {
            ApplyOutcome::Complete { applied: self.len }
        } else {
            ApplyOutcome::Partial {
                applied: self.len,
                dropped,
                duplicates,
                rejected,
            }
        }
    }

    /// Write one slot.  Re-writing an index overwrites it; the logical
    /// length grows to cover `index`, leaving skipped slots default.
    pub fn write_at(
        &mut self,
        index: usize,
        spec: &DeviceSpec,
        pins: &mut impl PinPort,
    ) -> Result<&Device, RegistryError> {
        if index >= MAX_DEVICES {
            return Err(RegistryError::IndexOutOfRange);
        }

        let device = Device::from_spec(spec)?;
        let taken_elsewhere = self
            .iter()
            .enumerate()
            .any(|(i, d)| i != index && !d.name().is_empty() && d.name() == device.name());
        if taken_elsewhere {
            return Err(RegistryError::DuplicateName(device.name().into()));
        }

        device.configure_pins(pins);
        self.slots[index] = device;
        self.len = self.len.max(index + 1);
        info!(
            "registry: slot {} = '{}' (len {})",
            index,
            self.slots[index].name(),
            self.len
        );
        Ok(&self.slots[index])
    }
}
