//! UART transport adapter.
//!
//! Implements [`Transport`] for the serial link between the MPINO and the
//! radio bridge.
//!
//! - **`target_os = "espidf"`** wraps `esp_idf_hal::uart::UartDriver`
//!   with non-blocking reads.
//! - **all other targets** an in-memory loopback: bytes pushed with
//!   `inject` are read back, writes are captured for inspection.

use crate::protocol::transport::Transport;

#[cfg(target_os = "espidf")]
mod imp {
    use esp_idf_hal::delay::NON_BLOCK;
    use esp_idf_hal::gpio::AnyIOPin;
    use esp_idf_hal::uart::{config::Config, UartDriver, UART1};
    use esp_idf_hal::units::Hertz;
    use esp_idf_sys::EspError;

    use super::Transport;
    use crate::pins::{LINK_UART_RX_GPIO, LINK_UART_TX_GPIO};

    /// Serial link over an ESP-IDF UART driver.
    pub struct UartLink<'d> {
        uart: UartDriver<'d>,
    }

    impl<'d> UartLink<'d> {
        pub fn new(uart: UartDriver<'d>) -> Self {
            Self { uart }
        }
    }

    impl UartLink<'static> {
        /// Open the board-to-board link on UART1, no flow control.
        pub fn open(uart: UART1, baud_rate: u32) -> Result<Self, EspError> {
            // SAFETY: the link pins are reserved for this UART on every image.
            let (tx, rx) = unsafe {
                (
                    AnyIOPin::new(LINK_UART_TX_GPIO),
                    AnyIOPin::new(LINK_UART_RX_GPIO),
                )
            };
            let config = Config::default().baudrate(Hertz(baud_rate));
            let uart = UartDriver::new(
                uart,
                tx,
                rx,
                Option::<AnyIOPin>::None,
                Option::<AnyIOPin>::None,
                &config,
            )?;
            log::info!("uart: link up at {} baud", baud_rate);
            Ok(Self::new(uart))
        }
    }

    impl Transport for UartLink<'_> {
        type Error = EspError;

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, EspError> {
            self.uart.read(buf, NON_BLOCK)
        }

        fn write(&mut self, data: &[u8]) -> Result<usize, EspError> {
            self.uart.write(data)
        }

        fn flush(&mut self) -> Result<(), EspError> {
            // TX FIFO drains in hardware; nothing buffered on our side.
            Ok(())
        }

        fn available(&self) -> bool {
            self.uart.remaining_read().map(|n| n > 0).unwrap_or(false)
        }
    }
}

#[cfg(not(target_os = "espidf"))]
mod imp {
    use std::collections::VecDeque;

    use super::Transport;

    /// Simulation link: scripted input, captured output.
    #[derive(Debug, Default)]
    pub struct UartLink {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
    }

    impl UartLink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue bytes to be returned by `read`.
        pub fn inject(&mut self, data: &[u8]) {
            self.rx.extend(data);
        }

        /// Everything written so far, leaving the capture empty.
        pub fn take_written(&mut self) -> Vec<u8> {
            core::mem::take(&mut self.tx)
        }
    }

    impl Transport for UartLink {
        type Error = core::convert::Infallible;

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            let n = buf.len().min(self.rx.len());
            for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        }

        fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
            self.tx.extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn available(&self) -> bool {
            !self.rx.is_empty()
        }
    }
}

pub use imp::UartLink;
