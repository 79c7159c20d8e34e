//! In-memory tank controller for tests.
//!
//! Answers like the firmware does: a pin write stores the level, a pin read
//! returns it, and every response echoes the request with `data` replaced.
//! Faults can be queued to make the next writes misbehave.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use fishtank_api::Packet;
use fishtank_api::packet::op_code;

use super::{SerialConnector, SerialIo};
use crate::errors::DeviceError;

#[derive(Debug, Clone)]
pub enum Fault {
    /// The write itself fails
    WriteError,
    /// The request is swallowed and nothing comes back
    NoResponse,
    /// These bytes come back instead of a response
    Reply(Vec<u8>),
}

#[derive(Default)]
struct DeviceState {
    faults: VecDeque<Fault>,
    failed_opens: u32,
    pins: HashMap<u16, f32>,
    temperature: f32,
    requests: Vec<Packet>,
    pending: Vec<u8>,
    chunk_size: Option<usize>,
    opens: u32,
}

/// Shared handle to the simulated controller.
#[derive(Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn connector(&self) -> Arc<MockConnector> {
        Arc::new(MockConnector { device: self.clone() })
    }

    pub fn push_fault(&self, fault: Fault) -> &Self {
        self.state().faults.push_back(fault);
        self
    }

    /// Fails the next `count` port opens.
    pub fn fail_opens(&self, count: u32) -> &Self {
        self.state().failed_opens = count;
        self
    }

    /// Delivers responses at most `size` bytes per read.
    pub fn with_chunk_size(&self, size: usize) -> &Self {
        self.state().chunk_size = Some(size);
        self
    }

    pub fn set_pin(&self, pin: u16, data: f32) -> &Self {
        self.state().pins.insert(pin, data);
        self
    }

    pub fn set_temperature(&self, temperature: f32) -> &Self {
        self.state().temperature = temperature;
        self
    }

    pub fn pin(&self, pin: u16) -> Option<f32> {
        self.state().pins.get(&pin).copied()
    }

    /// Every request that reached the device, in order.
    pub fn requests(&self) -> Vec<Packet> {
        self.state().requests.clone()
    }

    pub fn open_count(&self) -> u32 {
        self.state().opens
    }
}

impl DeviceState {
    fn respond(&mut self, request: Packet) -> Packet {
        let data = match request.op_code {
            op_code::PIN_IO | op_code::ANALOG_WRITE => {
                self.pins.insert(request.pin, request.data);
                request.data
            }
            op_code::READ_DIGITAL_PIN | op_code::READ_ANALOG_PIN => {
                self.pins.get(&request.pin).copied().unwrap_or_default()
            }
            op_code::READ_TEMPERATURE => self.temperature,
            _ => request.data,
        };

        request.with_data(data)
    }
}

pub struct MockConnector {
    device: MockDevice,
}

impl SerialConnector for MockConnector {
    fn open(&self, port_name: &str) -> Result<Box<dyn SerialIo>, DeviceError> {
        let mut state = self.device.state();
        if state.failed_opens > 0 {
            state.failed_opens -= 1;
            return Err(DeviceError::OpenFailed(format!("{port_name}: busy")));
        }

        state.opens += 1;
        Ok(Box::new(MockPort { device: self.device.clone() }))
    }
}

struct MockPort {
    device: MockDevice,
}

impl SerialIo for MockPort {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.device.state();

        match state.faults.pop_front() {
            Some(Fault::WriteError) => Err(io::Error::new(io::ErrorKind::BrokenPipe, "cable unplugged")),
            Some(Fault::NoResponse) => {
                if let Ok(request) = Packet::decode(bytes) {
                    state.requests.push(request);
                }
                Ok(())
            }
            Some(Fault::Reply(reply)) => {
                if let Ok(request) = Packet::decode(bytes) {
                    state.requests.push(request);
                }
                state.pending.extend(reply);
                Ok(())
            }
            None => {
                let request = Packet::decode(bytes)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                state.requests.push(request);
                let response = state.respond(request);
                state.pending.extend_from_slice(&response.encode());
                Ok(())
            }
        }
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.device.state();
        let limit = state.chunk_size.unwrap_or(usize::MAX);
        let count = state.pending.len().min(buf.len()).min(limit);

        buf[..count].copy_from_slice(&state.pending[..count]);
        state.pending.drain(..count);

        Ok(count)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.device.state().pending.clear();
        Ok(())
    }
}
