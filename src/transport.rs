//! The byte channel the scanner talks through.
//!
//! A [`Connector`] opens a [`Transport`] for one baud rate. The transport is
//! closed when it is dropped, so a session can't leak an open port on any
//! exit path.

use std::io::{Read, Write};
use std::time::Duration;

use log::debug;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use snafu::ResultExt;

use crate::error::{Error, TransportIoSnafu, TransportOpenSnafu};
use crate::DEFAULT_READ_TIMEOUT;

/// An open half-duplex byte channel.
pub trait Transport {
    /// Write the whole frame.
    fn write_all(&mut self, data: &[u8]) -> Result<(), Error>;

    /// Number of received bytes waiting to be read.
    fn bytes_available(&mut self) -> Result<usize, Error>;

    /// Read everything that has already arrived, until the input queue is
    /// empty. Returns an empty vector if nothing did, it doesn't wait for more.
    fn read_available(&mut self) -> Result<Vec<u8>, Error> {
        let mut data = Vec::new();
        loop {
            let count = self.bytes_available()?;
            if count == 0 {
                break;
            }
            let start = data.len();
            data.resize(start + count, 0);
            let len = self.read(&mut data[start..])?;
            data.truncate(start + len);
            if len == 0 {
                break;
            }
        }
        Ok(data)
    }

    /// Read into `buf`, returning the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;
}

/// Opens transports on a fixed port.
pub trait Connector {
    type Port: Transport;

    /// Open the port at `baud_rate`.
    /// # Errors
    /// [`Error::TransportOpen`] if the port is missing, busy or rejects the rate.
    fn open(&mut self, baud_rate: u32) -> Result<Self::Port, Error>;

    /// Name of the port, for status messages.
    fn port_name(&self) -> &str;
}

/// [`Connector`] for a local serial port, 8N1 without flow control.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    path: String,
    read_timeout: Duration,
}

impl SerialConnector {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl Connector for SerialConnector {
    type Port = SerialTransport;

    fn open(&mut self, baud_rate: u32) -> Result<SerialTransport, Error> {
        let port = serialport::new(&self.path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.read_timeout)
            .open()
            .context(TransportOpenSnafu {
                port: self.path.as_str(),
                baud_rate,
            })?;
        // stale bytes from a previous rate would be taken for a reply
        if let Err(e) = port.clear(ClearBuffer::All) {
            debug!("Failed to clear buffers of {}: {}", self.path, e);
        }
        debug!("Opened {} at {} baud", self.path, baud_rate);
        Ok(SerialTransport { port })
    }

    fn port_name(&self) -> &str {
        &self.path
    }
}

/// An open serial port. Closed on drop.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl Transport for SerialTransport {
    fn write_all(&mut self, data: &[u8]) -> Result<(), Error> {
        self.port.write_all(data).context(TransportIoSnafu)?;
        self.port.flush().context(TransportIoSnafu)
    }

    fn bytes_available(&mut self) -> Result<usize, Error> {
        let count = self
            .port
            .bytes_to_read()
            .map_err(std::io::Error::from)
            .context(TransportIoSnafu)?;
        Ok(count as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.port.read(buf).context(TransportIoSnafu)
    }
}
