//! Fixed-width binary frame exchanged with the tank controller.
//!
//! Layout (little-endian, 20 bytes):
//!
//! ```text
//! magic(2) | id(4) | client_id(4) | op_code(2) | pin(2) | pin_mode(2) | data(4, f32)
//! ```

pub mod error;

pub use error::PacketError;

use error::Result;

/// Protocol version marker carried in the first two bytes of every frame
pub const MAGIC: u16 = 31256;

/// Encoded size of every frame
pub const PACKET_SIZE: usize = 20;

/// Operation selectors understood by the firmware.
pub mod op_code {
    pub const READ_TEMPERATURE: u16 = 1000;
    pub const PIN_IO: u16 = 1001;
    pub const READ_DIGITAL_PIN: u16 = 1002;
    pub const ANALOG_WRITE: u16 = 1003;
    pub const READ_ANALOG_PIN: u16 = 1004;
}

pub mod pin_mode {
    pub const INPUT: u16 = 0x00;
    pub const OUTPUT: u16 = 0x01;
}

/// Digital logic level as carried in the `data` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn as_data(self) -> f32 {
        match self {
            Level::Low => 0.0,
            Level::High => 1.0,
        }
    }

    /// Interprets a returned payload, truncating it to an integer the way the
    /// firmware reports pin reads. Anything other than 0 or 1 is not a level.
    pub fn from_data(data: f32) -> Option<Self> {
        match data as i32 {
            0 => Some(Level::Low),
            1 => Some(Level::High),
            _ => None,
        }
    }

    pub fn invert(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub struct Packet {
    pub id: u32,
    pub client_id: u32,
    pub op_code: u16,
    pub pin: u16,
    pub pin_mode: u16,
    pub data: f32,
}

impl Packet {
    pub fn new(op_code: u16) -> Self {
        Self {
            op_code,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }

    pub fn with_client_id(mut self, client_id: u32) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn with_pin(mut self, pin: u16, pin_mode: u16) -> Self {
        self.pin = pin;
        self.pin_mode = pin_mode;
        self
    }

    pub fn with_data(mut self, data: f32) -> Self {
        self.data = data;
        self
    }

    /// Encodes packet to its wire frame
    pub fn encode(&self) -> [u8; PACKET_SIZE] {
        let mut buffer = [0u8; PACKET_SIZE];

        buffer[0..2].copy_from_slice(&MAGIC.to_le_bytes());
        buffer[2..6].copy_from_slice(&self.id.to_le_bytes());
        buffer[6..10].copy_from_slice(&self.client_id.to_le_bytes());
        buffer[10..12].copy_from_slice(&self.op_code.to_le_bytes());
        buffer[12..14].copy_from_slice(&self.pin.to_le_bytes());
        buffer[14..16].copy_from_slice(&self.pin_mode.to_le_bytes());
        buffer[16..20].copy_from_slice(&self.data.to_le_bytes());

        buffer
    }

    /// Decodes a complete frame. No partial input is accepted.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != PACKET_SIZE {
            return Err(PacketError::InvalidLength {
                expected: PACKET_SIZE,
                actual: data.len(),
            });
        }

        let magic = u16::from_le_bytes([data[0], data[1]]);
        if magic != MAGIC {
            return Err(PacketError::BadMagic(magic));
        }

        Ok(Self {
            id: u32::from_le_bytes([data[2], data[3], data[4], data[5]]),
            client_id: u32::from_le_bytes([data[6], data[7], data[8], data[9]]),
            op_code: u16::from_le_bytes([data[10], data[11]]),
            pin: u16::from_le_bytes([data[12], data[13]]),
            pin_mode: u16::from_le_bytes([data[14], data[15]]),
            data: f32::from_le_bytes([data[16], data[17], data[18], data[19]]),
        })
    }
}
