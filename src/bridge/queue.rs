//! Serial TX queue: MQTT client callback → main loop.
//!
//! The ESP-IDF MQTT client delivers messages on its own task.  That task
//! only translates and pushes finished lines here; the main loop owns the
//! UART and drains the queue.  A full queue drops the new line.
//!
//! ```text
//! ┌──────────────┐  SerialLine  ┌──────────────┐
//! │ MQTT callback│─────────────▶│  Main loop   │──▶ UART
//! └──────────────┘              └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

/// Queue depth.
pub const SERIAL_TX_DEPTH: usize = 16;

/// Longest queued line, terminator included.
pub const SERIAL_LINE_CAPACITY: usize = 128;

/// One encoded, newline-terminated serial line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialLine(pub Vec<u8, SERIAL_LINE_CAPACITY>);

impl SerialLine {
    /// `None` if `bytes` does not fit.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Vec::from_slice(bytes).ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

pub type SerialTxQueue = Channel<CriticalSectionRawMutex, SerialLine, SERIAL_TX_DEPTH>;

/// The bridge image's queue.
pub static SERIAL_TX: SerialTxQueue = Channel::new();
