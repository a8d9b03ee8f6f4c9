//! Change-only telemetry scanner.
//!
//! Every `interval_ms` the scanner walks the registry in slot order, reads
//! each device's sense pin and sends a `current` frame only when the value
//! was never sent or differs from the last one sent.  Between scans it is
//! idle; a call to [`TelemetryScanner::tick`] before the interval elapsed
//! does nothing.
//!
//! Times are `u32` milliseconds since boot and compared with wrapping
//! subtraction, so the scanner keeps its cadence across the ~49.7 day
//! rollover.

use log::{debug, info, warn};

use crate::app::ports::PinPort;
use crate::protocol::messages::Telemetry;
use crate::protocol::transport::{send_line, Transport};
use crate::error::CommsError;
use crate::registry::{DeviceKind, Reading, Registry};

/// Default scan interval (milliseconds).
pub const DEFAULT_INTERVAL_MS: u32 = 2000;

pub struct TelemetryScanner {
    interval_ms: u32,
    origin_ms: u32,
}

impl TelemetryScanner {
    /// `now_ms` starts the first interval.
    pub fn new(interval_ms: u32, now_ms: u32) -> Self {
        Self {
            interval_ms,
            origin_ms: now_ms,
        }
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Send the one-time `init_complete` frame.
    pub fn announce<T: Transport>(&self, out: &mut T) -> Result<(), CommsError> {
        send_line(out, &Telemetry::InitComplete { status: "ready" })?;
        info!("telemetry: init_complete sent");
        Ok(())
    }

    /// Scan if the interval has elapsed.  Returns the number of frames sent.
    pub fn tick<P: PinPort, T: Transport>(
        &mut self,
        now_ms: u32,
        registry: &mut Registry,
        pins: &mut P,
        out: &mut T,
    ) -> usize {
        if now_ms.wrapping_sub(self.origin_ms) < self.interval_ms {
            return 0;
        }
        self.origin_ms = now_ms;

        let mut sent = 0;
        for device in registry.iter_mut() {
            let Some(sense) = device.sense() else {
                continue;
            };
            let reading = match device.kind() {
                DeviceKind::Machine => Reading::Digital(pins.read_digital(sense)),
                DeviceKind::Sensor => Reading::Analog(pins.read_analog(sense)),
            };
            if !device.needs_report(reading) {
                continue;
            }

            let frame = Telemetry::Current {
                dev: device.name(),
                val: reading,
            };
            match send_line(out, &frame) {
                Ok(()) => {
                    debug!("telemetry: {} = {:?}", device.name(), reading);
                    device.record_report(reading);
                    sent += 1;
                }
                // Cache untouched: the value goes out again next scan.
                Err(e) => warn!("telemetry: {} not sent: {}", device.name(), e),
            }
        }
        sent
    }
}
