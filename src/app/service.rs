//! Controller service: the MPINO's hexagonal core.
//!
//! [`Controller`] owns the frame assembler, the device registry and the
//! telemetry scanner.  All I/O flows through port traits injected at call
//! sites, so the whole controller runs against mock adapters on the host.
//!
//! ```text
//!  Transport ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                │          Controller           │
//!    PinPort ◀──│ Assembler · Registry · Scanner │ ──▶ Transport
//!                └──────────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::{CapacityPolicy, ControllerConfig};
use crate::protocol::codec::{LineAssembler, LINE_CAPACITY};
use crate::protocol::dispatch::dispatch;
use crate::protocol::transport::{send_line, Transport};
use crate::registry::Registry;
use crate::telemetry::TelemetryScanner;

use super::events::AppEvent;
use super::ports::{EventSink, PinPort};

/// Bytes pulled from the link per read.
const READ_CHUNK: usize = 64;

pub struct Controller {
    assembler: LineAssembler<LINE_CAPACITY>,
    registry: Registry,
    scanner: TelemetryScanner,
    policy: CapacityPolicy,
    frames_handled: u32,
}

impl Controller {
    /// `now_ms` starts the first telemetry interval.
    pub fn new(config: &ControllerConfig, now_ms: u32) -> Self {
        Self {
            assembler: LineAssembler::new(),
            registry: Registry::new(),
            scanner: TelemetryScanner::new(config.telemetry_interval_ms, now_ms),
            policy: config.capacity_policy,
            frames_handled: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce readiness on the link.
    pub fn start<T: Transport>(&mut self, link: &mut T, sink: &mut impl EventSink) {
        match self.scanner.announce(link) {
            Ok(()) => sink.emit(&AppEvent::Started),
            Err(e) => warn!("controller: announce failed: {}", e),
        }
        info!(
            "controller: started (telemetry every {} ms, {:?} on overflow)",
            self.scanner.interval_ms(),
            self.policy
        );
    }

    // ── Per-loop work ─────────────────────────────────────────

    /// Drain the link, dispatching and answering every complete frame.
    /// Returns the number of frames handled.
    pub fn poll<T: Transport, P: PinPort>(
        &mut self,
        link: &mut T,
        pins: &mut P,
        sink: &mut impl EventSink,
    ) -> usize {
        let mut handled = 0;
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let n = match link.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!("controller: link read failed: {:?}", e);
                    break;
                }
            };

            let registry = &mut self.registry;
            let policy = self.policy;
            self.assembler.feed(&buf[..n], |frame| {
                let done = dispatch(frame, registry, pins, policy);
                if let Err(e) = send_line(link, &done.reply) {
                    warn!("controller: reply lost: {}", e);
                }
                sink.emit(&done.event);
                handled += 1;
            });
        }
        self.frames_handled = self.frames_handled.wrapping_add(handled as u32);
        handled
    }

    /// Run the telemetry scanner.  Returns the number of frames sent.
    pub fn tick<T: Transport, P: PinPort>(
        &mut self,
        now_ms: u32,
        pins: &mut P,
        link: &mut T,
        sink: &mut impl EventSink,
    ) -> usize {
        let sent = self.scanner.tick(now_ms, &mut self.registry, pins, link);
        if sent > 0 {
            sink.emit(&AppEvent::TelemetrySent { count: sent });
        }
        sent
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Frames handled since boot (wraps).
    pub fn frames_handled(&self) -> u32 {
        self.frames_handled
    }

    /// Bytes dropped because a frame outgrew the assembler.
    pub fn dropped_bytes(&self) -> u32 {
        self.assembler.dropped_bytes()
    }
}
