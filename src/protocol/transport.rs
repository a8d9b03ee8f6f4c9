//! Transport abstraction: any byte-oriented channel.
//!
//! Concrete implementations:
//! - UART link between the MPINO and the radio bridge
//! - the recording serial mock in the host integration tests
//!
//! The controller, the pump variant and the bridge are generic over
//! `Transport`, so none of them know which UART they are talking to.

use log::warn;
use serde::Serialize;

use super::codec::encode_line_vec;
use crate::error::CommsError;

/// Byte-oriented transport channel.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns the number of bytes actually read.
    /// Returns 0 if no data is available (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data` to the transport.
    /// Returns the number of bytes actually written.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Check if data is available for reading.
    fn available(&self) -> bool;
}

/// A null transport that discards all writes and never reads.
pub struct NullTransport;

impl Transport for NullTransport {
    type Error = ();

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn available(&self) -> bool {
        false
    }
}

/// Write all of `data`, looping over short writes.
///
/// A transport that accepts zero bytes is treated as failed rather than
/// retried forever.
pub fn write_all<T: Transport>(link: &mut T, mut data: &[u8]) -> Result<(), CommsError> {
    while !data.is_empty() {
        match link.write(data) {
            Ok(0) => return Err(CommsError::SerialWriteFailed),
            Ok(n) => data = &data[n.min(data.len())..],
            Err(e) => {
                warn!("transport: write failed: {:?}", e);
                return Err(CommsError::SerialWriteFailed);
            }
        }
    }
    link.flush().map_err(|e| {
        warn!("transport: flush failed: {:?}", e);
        CommsError::SerialWriteFailed
    })
}

/// Serialise `msg` as one JSON line and write it out.
pub fn send_line<T: Transport, M: Serialize + ?Sized>(
    link: &mut T,
    msg: &M,
) -> Result<(), CommsError> {
    write_all(link, &encode_line_vec(msg))
}
