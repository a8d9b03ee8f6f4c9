//! PlantPoint rig firmware library.
//!
//! Shared by the three images (MPINO controller, pump-control variant,
//! ESP32 MQTT bridge) and exposed for integration testing.  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod bridge;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod protocol;
pub mod pump;
pub mod registry;
pub mod sensors;
pub mod telemetry;
