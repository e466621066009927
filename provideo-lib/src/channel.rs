//! Byte-oriented duplex transport underneath the protocol.
//!
//! The protocol never assumes that one read returns one response line: a
//! [`Channel`] hands out whatever bytes happen to be available.

use crate::error::Result;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Duplex byte stream to one physical device.
pub trait Channel: Send {
    /// Write all of `data` to the device.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    ///
    /// `Ok(0)` means nothing arrived yet, not end of stream.
    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Discard any input that is buffered but not yet read.
    fn flush(&mut self) -> Result<()>;
}

/// A channel shared by every protocol handle of a connection.
pub type SharedChannel = Arc<Mutex<Box<dyn Channel>>>;

#[cfg(feature = "serial")]
pub use serial::SerialChannel;

#[cfg(feature = "serial")]
mod serial {
    use super::Channel;
    use crate::config::SerialConfig;
    use crate::error::{Error, Result};
    use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::{self, Read, Write};
    use std::time::Duration;
    use tracing::{info, trace};

    /// [`Channel`] over an RS232/RS485 serial port.
    pub struct SerialChannel {
        port: Box<dyn SerialPort>,
    }

    impl SerialChannel {
        pub fn open(config: &SerialConfig) -> Result<Self> {
            info!("Opening {} at {} baud", config.port, config.baud_rate);
            let port = serialport::new(&config.port, config.baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(Duration::from_millis(10))
                .open()
                .map_err(map_serial_error)?;
            Ok(Self { port })
        }

        /// Names of the serial ports present on this machine.
        pub fn available_ports() -> Result<Vec<String>> {
            let ports = serialport::available_ports().map_err(map_serial_error)?;
            Ok(ports.into_iter().map(|p| p.port_name).collect())
        }
    }

    impl Channel for SerialChannel {
        fn send(&mut self, data: &[u8]) -> Result<()> {
            self.port.write_all(data).map_err(map_io_error)?;
            self.port.flush().map_err(map_io_error)?;
            Ok(())
        }

        fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
            self.port.set_timeout(timeout).map_err(map_serial_error)?;
            match self.port.read(buf) {
                Ok(n) => {
                    trace!(bytes = n, "serial read");
                    Ok(n)
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => Ok(0),
                Err(e) => Err(map_io_error(e)),
            }
        }

        fn flush(&mut self) -> Result<()> {
            self.port.clear(ClearBuffer::Input).map_err(map_serial_error)
        }
    }

    fn map_serial_error(e: serialport::Error) -> Error {
        match e.kind() {
            serialport::ErrorKind::NoDevice => Error::NoDevice,
            serialport::ErrorKind::InvalidInput => Error::InvalidArgument(e.description),
            serialport::ErrorKind::Io(kind) => Error::Io(io::Error::new(kind, e.description)),
            serialport::ErrorKind::Unknown => Error::Io(io::Error::other(e.description)),
        }
    }

    fn map_io_error(e: io::Error) -> Error {
        match e.kind() {
            io::ErrorKind::NotConnected | io::ErrorKind::BrokenPipe => Error::NoDevice,
            _ => Error::Io(e),
        }
    }
}
