use core::fmt;

/// A frame that can not be turned into a [`Packet`](super::Packet).
///
/// Both variants are the protocol's "malformed frame": the bytes are dropped and
/// nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// Byte count differs from the fixed frame size
    InvalidLength { expected: usize, actual: usize },
    /// Leading two bytes are not the protocol magic
    BadMagic(u16),
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength { expected, actual } => {
                write!(f, "Invalid frame length: expected {} bytes, got {}", expected, actual)
            }
            Self::BadMagic(magic) => write!(f, "Unexpected magic: {:#06x}", magic),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PacketError {}

pub type Result<T> = core::result::Result<T, PacketError>;
