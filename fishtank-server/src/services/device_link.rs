use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use fishtank_api::packet::PACKET_SIZE;
use fishtank_api::Packet;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::configs::Device;
use crate::errors::DeviceError;
use crate::services::serial::{SerialConnector, SerialIo};

#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub client_id: u32,
    /// Polls of the receive buffer before an attempt times out
    pub read_attempts: u32,
    pub read_interval: Duration,
    /// Pause after closing and after reopening the port during a repair
    pub repair_cooldown: Duration,
    /// Retries after the first attempt, each preceded by a repair
    pub max_retries: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::from(&Device::default())
    }
}

impl From<&Device> for LinkConfig {
    fn from(device: &Device) -> Self {
        Self {
            client_id: device.client_id,
            read_attempts: device.read_attempts,
            read_interval: Duration::from_millis(device.read_interval_ms),
            repair_cooldown: Duration::from_millis(device.repair_cooldown_ms),
            max_retries: device.max_retries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStatus {
    pub connected: bool,
    pub port_name: String,
    /// Repairs since the last successful exchange
    pub retry_count: u32,
}

struct Session {
    port: Option<Box<dyn SerialIo>>,
    port_name: String,
    retry_count: u32,
}

/// Request/response channel to the tank controller.
///
/// One exchange at a time: the session lock is held from the write until the
/// response arrives or the retries are exhausted.
pub struct DeviceLink {
    connector: Arc<dyn SerialConnector>,
    config: LinkConfig,
    session: Mutex<Session>,
    sequence: AtomicU32,
}

impl DeviceLink {
    pub fn new(connector: Arc<dyn SerialConnector>, port_name: impl Into<String>, config: LinkConfig) -> Self {
        Self {
            connector,
            config,
            session: Mutex::new(Session {
                port: None,
                port_name: port_name.into(),
                retry_count: 0,
            }),
            sequence: AtomicU32::new(1),
        }
    }

    pub async fn open(&self) -> Result<(), DeviceError> {
        let mut session = self.session.lock().await;
        self.connect(&mut session)
    }

    /// Drops the port. Closing a closed link does nothing.
    pub async fn close(&self) {
        let mut session = self.session.lock().await;
        if session.port.take().is_some() {
            tracing::info!("Closed serial port {}", session.port_name);
        }
    }

    pub async fn status(&self) -> LinkStatus {
        let session = self.session.lock().await;
        LinkStatus {
            connected: session.port.is_some(),
            port_name: session.port_name.clone(),
            retry_count: session.retry_count,
        }
    }

    /// Sends `request` and waits for the controller's answer, repairing the
    /// link between failed attempts.
    pub async fn exchange(&self, request: Packet) -> Result<Packet, DeviceError> {
        let request = request
            .with_id(self.sequence.fetch_add(1, Ordering::Relaxed))
            .with_client_id(self.config.client_id);

        let mut session = self.session.lock().await;

        if session.port.is_none() {
            if let Err(e) = self.connect(&mut session) {
                tracing::warn!("Serial port unavailable before exchange: {}", e);
            }
        }

        let attempts = self.config.max_retries + 1;
        for attempt in 0..attempts {
            if attempt > 0 {
                tracing::warn!("Repairing serial link, retry {} of {}", attempt, self.config.max_retries);
                self.repair(&mut session).await;
            }

            match self.try_exchange(&mut session, &request).await {
                Ok(response) => {
                    session.retry_count = 0;
                    return Ok(response);
                }
                Err(e) if !e.is_transient() => {
                    tracing::error!("Dropping response to request {}: {}", request.id, e);
                    return Err(e);
                }
                Err(e) => tracing::warn!("Exchange attempt {} failed: {}", attempt + 1, e),
            }
        }

        tracing::error!("Giving up on request {} after {} attempts", request.id, attempts);

        Err(DeviceError::DeviceUnreachable { attempts })
    }

    fn connect(&self, session: &mut Session) -> Result<(), DeviceError> {
        let port = self.connector.open(&session.port_name)?;
        session.port = Some(port);
        tracing::info!("Opened serial port {}", session.port_name);
        Ok(())
    }

    async fn repair(&self, session: &mut Session) {
        session.retry_count += 1;
        session.port = None;
        sleep(self.config.repair_cooldown).await;

        if let Err(e) = self.connect(session) {
            tracing::warn!("Reopen failed: {}", e);
        }

        sleep(self.config.repair_cooldown).await;
    }

    async fn try_exchange(&self, session: &mut Session, request: &Packet) -> Result<Packet, DeviceError> {
        let port = session.port.as_mut().ok_or(DeviceError::NotConnected)?;

        port.discard_input()
            .map_err(|e| DeviceError::ReadFailure(e.to_string()))?;

        tracing::debug!("-> {:?}", request);
        port.write_all(&request.encode())
            .map_err(|e| DeviceError::WriteFailure(e.to_string()))?;

        let mut frame = [0u8; PACKET_SIZE];
        let mut filled = 0;

        for _ in 0..self.config.read_attempts {
            filled += port.read_available(&mut frame[filled..])
                .map_err(|e| DeviceError::ReadFailure(e.to_string()))?;

            if filled == PACKET_SIZE {
                let response = Packet::decode(&frame)?;
                tracing::debug!("<- {:?}", response);

                if response.id != request.id {
                    tracing::warn!("Response id {} does not match request id {}", response.id, request.id);
                }

                return Ok(response);
            }

            sleep(self.config.read_interval).await;
        }

        Err(DeviceError::Timeout(self.config.read_interval * self.config.read_attempts))
    }
}

#[cfg(test)]
mod tests {
    use fishtank_api::packet::{op_code, pin_mode, MAGIC};

    use super::*;
    use crate::services::serial::mock::{Fault, MockDevice};

    fn test_config() -> LinkConfig {
        LinkConfig {
            client_id: 56432,
            read_attempts: 5,
            read_interval: Duration::from_millis(10),
            repair_cooldown: Duration::from_millis(2000),
            max_retries: 5,
        }
    }

    fn link(device: &MockDevice) -> DeviceLink {
        DeviceLink::new(device.connector(), "/dev/ttyMOCK", test_config())
    }

    /// Enough polls for a frame trickling in one byte at a time
    fn patient_link(device: &MockDevice) -> DeviceLink {
        let config = LinkConfig {
            read_attempts: 32,
            ..test_config()
        };
        DeviceLink::new(device.connector(), "/dev/ttyMOCK", config)
    }

    fn set_pin_request() -> Packet {
        Packet::new(op_code::PIN_IO).with_pin(46, pin_mode::OUTPUT).with_data(0.0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_exchange_stamps_id_and_client() {
        let device = MockDevice::new();
        let link = link(&device);
        link.open().await.unwrap();

        let first = link.exchange(set_pin_request()).await.unwrap();
        let second = link.exchange(set_pin_request()).await.unwrap();

        assert_eq!(first.client_id, 56432);
        assert_eq!(second.id, first.id + 1);
        assert_eq!(device.pin(46), Some(0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exchange_opens_lazily() {
        let device = MockDevice::new();
        let link = link(&device);

        assert!(!link.status().await.connected);
        link.exchange(set_pin_request()).await.unwrap();

        let status = link.status().await;
        assert!(status.connected);
        assert_eq!(status.port_name, "/dev/ttyMOCK");
        assert_eq!(device.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_assembles_response_from_partial_reads() {
        let device = MockDevice::new();
        device.with_chunk_size(3).set_temperature(25.5);
        let link = patient_link(&device);

        let response = link.exchange(Packet::new(op_code::READ_TEMPERATURE)).await.unwrap();

        assert_eq!(response.data, 25.5);
        assert_eq!(device.requests().len(), 1);
        assert_eq!(device.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_timeouts() {
        let device = MockDevice::new();
        device.push_fault(Fault::NoResponse).push_fault(Fault::NoResponse);
        device.set_temperature(24.0);
        let link = link(&device);

        let started = tokio::time::Instant::now();
        let response = link.exchange(Packet::new(op_code::READ_TEMPERATURE)).await.unwrap();

        assert_eq!(response.data, 24.0);
        assert_eq!(device.requests().len(), 3);
        // One open up front plus a reopen per repair
        assert_eq!(device.open_count(), 3);
        // Each repair waits out the cooldown twice
        assert!(started.elapsed() >= Duration::from_millis(2 * 2 * 2000));
        assert_eq!(link.status().await.retry_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failures_retry_exactly_n_times() {
        let device = MockDevice::new();
        for _ in 0..3 {
            device.push_fault(Fault::WriteError);
        }
        let link = link(&device);

        let response = link.exchange(set_pin_request()).await.unwrap();

        assert_eq!(response.pin, 46);
        assert_eq!(device.requests().len(), 1);
        assert_eq!(device.open_count(), 1 + 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_after_exact_attempt_count() {
        let device = MockDevice::new();
        for _ in 0..10 {
            device.push_fault(Fault::NoResponse);
        }
        let link = link(&device);

        let result = link.exchange(set_pin_request()).await;

        assert!(matches!(result, Err(DeviceError::DeviceUnreachable { attempts: 6 })));
        assert_eq!(device.requests().len(), 6);
        assert_eq!(link.status().await.retry_count, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_reopen_counts_as_attempt() {
        let device = MockDevice::new();
        device.push_fault(Fault::NoResponse);
        let link = link(&device);
        link.open().await.unwrap();
        device.fail_opens(1);

        let response = link.exchange(set_pin_request()).await;

        // Attempt 1 times out, the first reopen fails, the second repair succeeds
        assert!(response.is_ok());
        assert_eq!(device.requests().len(), 2);
        assert_eq!(device.open_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frame_is_not_retried() {
        let device = MockDevice::new();
        let mut garbage = Packet::new(op_code::PIN_IO).encode();
        garbage[0] = !(MAGIC as u8);
        device.push_fault(Fault::Reply(garbage.to_vec()));
        let link = link(&device);

        let result = link.exchange(set_pin_request()).await;

        assert!(matches!(result, Err(DeviceError::MalformedFrame(_))));
        assert_eq!(device.requests().len(), 1);
        assert_eq!(device.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatched_response_id_is_accepted() {
        let device = MockDevice::new();
        let stale = Packet::new(op_code::PIN_IO).with_id(999).with_pin(46, pin_mode::OUTPUT);
        device.push_fault(Fault::Reply(stale.encode().to_vec()));
        let link = link(&device);

        let response = link.exchange(set_pin_request()).await.unwrap();

        assert_eq!(response.id, 999);
        assert_ne!(device.requests()[0].id, 999);
        assert_eq!(device.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_exchanges_are_serialized() {
        let device = MockDevice::new();
        device.with_chunk_size(1);
        let link = Arc::new(patient_link(&device));

        let handles: Vec<_> = (0..4u16)
            .map(|pin| {
                let link = link.clone();
                tokio::spawn(async move {
                    link.exchange(Packet::new(op_code::PIN_IO).with_pin(40 + pin, pin_mode::OUTPUT).with_data(1.0))
                        .await
                })
            })
            .collect();

        for handle in handles {
            let response = handle.await.unwrap().unwrap();
            assert_eq!(response.data, 1.0);
        }

        let requests = device.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(device.open_count(), 1);
        for pin in 40..44 {
            assert_eq!(device.pin(pin), Some(1.0));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_is_idempotent() {
        let device = MockDevice::new();
        let link = link(&device);
        link.open().await.unwrap();

        link.close().await;
        link.close().await;

        assert!(!link.status().await.connected);
    }
}
