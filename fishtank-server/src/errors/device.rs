use std::time::Duration;

use axum::http::StatusCode;
use fishtank_api::PacketError;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Serial port is not connected")]
    NotConnected,

    #[error("Failed to open serial port: {0}")]
    OpenFailed(String),

    #[error("Failed to write to serial port: {0}")]
    WriteFailure(String),

    #[error("Failed to read from serial port: {0}")]
    ReadFailure(String),

    #[error("No complete response within {0:?}")]
    Timeout(Duration),

    #[error("Malformed response frame: {0}")]
    MalformedFrame(PacketError),

    #[error("Device unreachable after {attempts} attempts")]
    DeviceUnreachable { attempts: u32 },
}

impl DeviceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DeviceError::NotConnected => StatusCode::SERVICE_UNAVAILABLE,
            DeviceError::OpenFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            DeviceError::WriteFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            DeviceError::ReadFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            DeviceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            DeviceError::MalformedFrame(_) => StatusCode::BAD_GATEWAY,
            DeviceError::DeviceUnreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Whether repairing the link and resending may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, DeviceError::MalformedFrame(_) | DeviceError::DeviceUnreachable { .. })
    }
}

impl From<PacketError> for DeviceError {
    fn from(error: PacketError) -> Self {
        DeviceError::MalformedFrame(error)
    }
}
