//! Newline-delimited frame codec.
//!
//! Wire format:
//! ```text
//! ┌──────────────────────────────┬────────────┐
//! │ compact JSON object (N B)    │ "\n" / "\r"│
//! └──────────────────────────────┴────────────┘
//! ```
//!
//! The assembler accumulates incoming bytes into a fixed buffer and yields
//! complete frames.  This handles partial reads gracefully: a single
//! `Transport::read` may return part of a line, exactly one line, or several
//! lines concatenated.
//!
//! A line longer than the buffer is truncated: bytes past capacity are
//! dropped until the next terminator.  The receiver then sees a cut-off
//! JSON object and answers with a parse error.

use serde::Serialize;

use crate::error::CommsError;

/// Frame capacity of every image.  Sized for a bulk `config` of
/// `MAX_DEVICES` entries with mid-length names.
pub const LINE_CAPACITY: usize = 1024;

/// Streaming line assembler with `N` bytes of storage.
pub struct LineAssembler<const N: usize> {
    buf: heapless::Vec<u8, N>,
    /// A frame was surfaced; clear before the next byte lands.
    surfaced: bool,
    dropped_bytes: u32,
}

impl<const N: usize> Default for LineAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineAssembler<N> {
    pub fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
            surfaced: false,
            dropped_bytes: 0,
        }
    }

    /// Push one byte.
    ///
    /// Returns `Some(frame)` when `byte` terminates a non-empty line.  The
    /// slice is valid until the next call to `push`.
    pub fn push(&mut self, byte: u8) -> Option<&[u8]> {
        if self.surfaced {
            self.buf.clear();
            self.surfaced = false;
        }

        match byte {
            b'\r' | b'\n' => {
                if self.buf.is_empty() {
                    return None;
                }
                self.surfaced = true;
                Some(&self.buf)
            }
            _ => {
                if self.buf.push(byte).is_err() {
                    self.dropped_bytes = self.dropped_bytes.saturating_add(1);
                }
                None
            }
        }
    }

    /// Push every byte of `data`, calling `on_frame` once per completed line.
    pub fn feed(&mut self, data: &[u8], mut on_frame: impl FnMut(&[u8])) {
        for &byte in data {
            if let Some(frame) = self.push(byte) {
                on_frame(frame);
            }
        }
    }

    /// Discard any partial line (e.g. after the link was re-opened).
    pub fn reset(&mut self) {
        self.buf.clear();
        self.surfaced = false;
    }

    /// Bytes discarded because a line outgrew the buffer.
    pub fn dropped_bytes(&self) -> u32 {
        self.dropped_bytes
    }

    /// Bytes of the line currently being assembled.
    pub fn pending(&self) -> usize {
        if self.surfaced { 0 } else { self.buf.len() }
    }
}

/// Serialize `msg` as one compact JSON line into `out`.
///
/// Returns the number of bytes written, terminator included.
pub fn encode_line<T: Serialize + ?Sized>(msg: &T, out: &mut [u8]) -> Result<usize, CommsError> {
    let json = serde_json::to_vec(msg).map_err(|_| CommsError::FrameTooLarge)?;
    let total = json.len() + 1;
    if total > out.len() {
        return Err(CommsError::FrameTooLarge);
    }
    out[..json.len()].copy_from_slice(&json);
    out[json.len()] = b'\n';
    Ok(total)
}

/// Serialize `msg` as one compact JSON line into an owned buffer.
pub fn encode_line_vec<T: Serialize + ?Sized>(msg: &T) -> Vec<u8> {
    // Our message types only hold strings, integers and bools, which
    // serde_json always serialises.
    let mut line = serde_json::to_vec(msg).unwrap_or_default();
    line.push(b'\n');
    line
}
