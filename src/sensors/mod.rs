//! Sensor drivers.
//!
//! Device sense pins on the controller are read through the
//! [`PinPort`](crate::app::ports::PinPort) by the telemetry scanner; only
//! the pump variant's flow sensor needs a driver of its own.

pub mod flow;
