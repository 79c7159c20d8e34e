//! Byte transport underneath the device link.

#[cfg(any(test, feature = "mock"))]
pub mod mock;

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::{available_ports, ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::errors::DeviceError;

/// An open serial port.
pub trait SerialIo: Send {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Copies whatever has already arrived into `buf` without waiting. Returns
    /// `Ok(0)` when nothing is pending.
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Drops bytes left over from an earlier exchange.
    fn discard_input(&mut self) -> io::Result<()>;
}

/// Opens ports by name. The port closes when the returned handle is dropped.
pub trait SerialConnector: Send + Sync {
    fn open(&self, port_name: &str) -> Result<Box<dyn SerialIo>, DeviceError>;
}

/// `serialport` backed connector, 8N1 without flow control.
pub struct NativeConnector {
    baud_rate: u32,
}

impl NativeConnector {
    pub fn new(baud_rate: u32) -> Self {
        Self { baud_rate }
    }
}

impl SerialConnector for NativeConnector {
    fn open(&self, port_name: &str) -> Result<Box<dyn SerialIo>, DeviceError> {
        tracing::debug!("Connect to port: {}", port_name);

        let port = serialport::new(port_name, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(10))
            .open()
            .map_err(|e| DeviceError::OpenFailed(format!("{port_name}: {e}")))?;

        Ok(Box::new(NativePort { port }))
    }
}

struct NativePort {
    port: Box<dyn SerialPort>,
}

impl SerialIo for NativePort {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let pending = self.port.bytes_to_read()? as usize;
        if pending == 0 || buf.is_empty() {
            return Ok(0);
        }

        let len = pending.min(buf.len());
        match self.port.read(&mut buf[..len]) {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            other => other,
        }
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

/// Name of the first serial port the system reports.
pub fn first_available_port() -> Result<String, DeviceError> {
    available_ports()
        .map_err(|e| DeviceError::OpenFailed(e.to_string()))?
        .first()
        .map(|port| port.port_name.clone())
        .ok_or_else(|| DeviceError::OpenFailed("no serial port found".to_string()))
}
