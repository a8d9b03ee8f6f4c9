//! Hall-effect pulse flow meter (pump-control variant).
//!
//! The sensor emits one pulse per fixed volume of water.  Edges are counted
//! either by a GPIO ISR incrementing an atomic counter, or by the main loop
//! sampling the pin and counting low→high transitions.  Once per window the
//! meter swaps the counter to zero and converts the count to a flow rate
//! and an accumulated volume.
//!
//! The swap is a single atomic operation, so an edge landing between the
//! read and the reset cannot be lost and the ISR never has to be detached.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::FlowConfig;

/// ISR-safe edge counter.
pub struct EdgeCounter(AtomicU32);

impl EdgeCounter {
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Count one edge.  Safe to call from interrupt context.
    pub fn record_edge(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Edges since the last `take`, resetting the count to zero.
    pub fn take(&self) -> u32 {
        self.0.swap(0, Ordering::Relaxed)
    }

    /// Edges since the last `take`, without resetting.
    pub fn peek(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for EdgeCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Edge counter shared with the flow-sensor ISR.
/// `static` because ISR callbacks in ESP-IDF cannot capture closures.
pub static FLOW_EDGES: EdgeCounter = EdgeCounter::new();

/// Called from the GPIO ISR on each rising edge.
pub fn flow_isr_handler() {
    FLOW_EDGES.record_edge();
}

/// Software edge detection for boards where the sensor pin has no
/// interrupt.  Only accurate while the loop samples faster than twice the
/// pulse rate.
#[derive(Debug, Default)]
pub struct PolledEdgeDetector {
    last_level: bool,
}

impl PolledEdgeDetector {
    pub fn new(initial_level: bool) -> Self {
        Self {
            last_level: initial_level,
        }
    }

    /// Feed one pin sample; counts into `counter` on a rising edge.
    /// Returns `true` if this sample was a rising edge.
    pub fn sample(&mut self, level: bool, counter: &EdgeCounter) -> bool {
        let rising = level && !self.last_level;
        self.last_level = level;
        if rising {
            counter.record_edge();
        }
        rising
    }
}

/// Result of one closed measurement window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowReading {
    /// Edges counted in the window.
    pub pulses: u32,
    /// Measured window length (milliseconds).
    pub elapsed_ms: u32,
    /// Flow rate over the window (L/min).
    pub flow_lpm: f32,
    /// Accumulated volume since boot or the last reset (L).
    pub total_litres: f64,
}

/// Window-based flow and volume computation over an [`EdgeCounter`].
pub struct PulseFlowMeter<'a> {
    counter: &'a EdgeCounter,
    window_ms: u32,
    k_factor: f32,
    pulses_per_litre: f32,
    window_start_ms: u32,
    flow_lpm: f32,
    /// Edges since boot or the last reset.  Volume is derived from this
    /// count so per-window rounding never accumulates.
    total_pulses: u64,
}

impl<'a> PulseFlowMeter<'a> {
    /// `now_ms` opens the first window.
    pub fn new(counter: &'a EdgeCounter, config: &FlowConfig, now_ms: u32) -> Self {
        Self {
            counter,
            window_ms: config.window_ms,
            k_factor: config.k_factor,
            pulses_per_litre: config.pulses_per_litre,
            window_start_ms: now_ms,
            flow_lpm: 0.0,
            total_pulses: 0,
        }
    }

    /// Close the window if it has run its length.
    ///
    /// Uses the measured elapsed time, not the nominal window, so a late
    /// tick does not inflate the rate.
    pub fn tick(&mut self, now_ms: u32) -> Option<FlowReading> {
        let elapsed_ms = now_ms.wrapping_sub(self.window_start_ms);
        if elapsed_ms < self.window_ms {
            return None;
        }

        let pulses = self.counter.take();
        self.window_start_ms = now_ms;

        let elapsed_secs = elapsed_ms as f32 / 1000.0;
        // Hz / (Hz per L/min) = L/min
        self.flow_lpm = (pulses as f32 / elapsed_secs) / self.k_factor;
        self.total_pulses += u64::from(pulses);

        Some(FlowReading {
            pulses,
            elapsed_ms,
            flow_lpm: self.flow_lpm,
            total_litres: self.total_litres(),
        })
    }

    /// Zero the accumulated volume and discard the in-flight edge count.
    /// Calibration and window timing are kept.
    pub fn reset_total(&mut self) {
        self.counter.take();
        self.total_pulses = 0;
    }

    pub fn flow_lpm(&self) -> f32 {
        self.flow_lpm
    }

    pub fn total_litres(&self) -> f64 {
        self.total_pulses as f64 / f64::from(self.pulses_per_litre)
    }

    pub fn total_pulses(&self) -> u64 {
        self.total_pulses
    }

    pub fn k_factor(&self) -> f32 {
        self.k_factor
    }

    pub fn pulses_per_litre(&self) -> f32 {
        self.pulses_per_litre
    }
}
