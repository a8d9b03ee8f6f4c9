//! Application core: domain logic behind port traits.
//!
//! The controller service, the event vocabulary shared by all three
//! images, and the **port traits** in [`ports`] that keep this layer
//! testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
