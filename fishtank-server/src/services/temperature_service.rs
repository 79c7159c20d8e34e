use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::models::Temperature;
use crate::repositories::TemperatureRepository;
use crate::services::{truncate_to_second, ActuatorService};

/// Periodically records the water temperature and drives the heater toward an
/// optional target.
pub struct TemperatureService {
    actuator_service: Arc<ActuatorService>,
    temperature_repository: Arc<TemperatureRepository>,
    interval: Duration,
    target: Option<f32>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TemperatureService {
    pub fn new(
        actuator_service: Arc<ActuatorService>,
        temperature_repository: Arc<TemperatureRepository>,
        interval: Duration,
        target: Option<f32>,
    ) -> Self {
        Self {
            actuator_service,
            temperature_repository,
            interval,
            target,
            stop_tx: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    pub async fn start(self: &Arc<Self>) {
        let mut stop_tx = self.stop_tx.lock().await;
        if stop_tx.is_some() {
            tracing::warn!("Temperature service already running");
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        *stop_tx = Some(tx);

        let service = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = rx.changed() => break,
                    _ = tokio::time::sleep(service.interval) => {}
                }

                if let Err(e) = service.sample().await {
                    tracing::error!("Failed to store temperature: {}", e);
                }
            }
        });
        *self.handle.lock().await = Some(handle);

        tracing::info!("Temperature service started, sampling every {:?}", self.interval);
    }

    pub async fn stop(&self) {
        let Some(stop_tx) = self.stop_tx.lock().await.take() else {
            return;
        };
        let _ = stop_tx.send(true);

        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::error!("Temperature loop ended abnormally: {}", e);
            }
        }
    }

    /// Takes one reading. Returns the stored value, or `None` when the probe
    /// could not be read or reported a non-positive value.
    pub async fn sample(&self) -> Result<Option<f32>, sqlx::Error> {
        let temperature = match self.actuator_service.read_temperature().await {
            Ok(temperature) => temperature,
            Err(e) => {
                tracing::warn!("Temperature read failed: {}", e);
                return Ok(None);
            }
        };

        if temperature <= 0.0 {
            tracing::warn!("Discarding temperature reading {}", temperature);
            return Ok(None);
        }

        let record = Temperature {
            id: 0,
            temperature,
            time: truncate_to_second(OffsetDateTime::now_utc()),
        };

        let mut tx = self.temperature_repository.get_storage().begin().await?;
        self.temperature_repository.create(&record, &mut tx).await?;
        tx.commit().await?;

        if let Some(target) = self.target {
            let heat = temperature < target;
            if let Err(e) = self.actuator_service.enable_heater(heat).await {
                tracing::warn!("Failed to switch heater: {}", e);
            }
        }

        Ok(Some(temperature))
    }

    /// Stored readings of the last `days` days, oldest first.
    pub async fn read_history(&self, days: i64) -> Result<Vec<Temperature>, sqlx::Error> {
        let since = OffsetDateTime::now_utc() - time::Duration::days(days.max(0));

        self.temperature_repository.find_since(truncate_to_second(since)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::{Database, SchemaManager, Storage};
    use crate::services::serial::mock::MockDevice;
    use crate::services::{DeviceLink, LinkConfig};

    async fn setup(device: &MockDevice, target: Option<f32>) -> TemperatureService {
        let storage = Arc::new(
            Storage::new(
                Database {
                    migration_path: None,
                    clean_start: true,
                    url: String::from("sqlite::memory:"),
                },
                SchemaManager::default(),
            )
            .await
            .unwrap(),
        );

        let link = Arc::new(DeviceLink::new(device.connector(), "mock", LinkConfig::default()));

        TemperatureService::new(
            Arc::new(ActuatorService::new(link)),
            Arc::new(TemperatureRepository::new(storage)),
            Duration::from_secs(300),
            target,
        )
    }

    #[tokio::test]
    async fn test_sample_stores_valid_readings_only() {
        let device = MockDevice::new();
        let service = setup(&device, None).await;

        device.set_temperature(-127.0);
        assert_eq!(service.sample().await.unwrap(), None);

        device.set_temperature(0.0);
        assert_eq!(service.sample().await.unwrap(), None);

        device.set_temperature(25.5);
        assert_eq!(service.sample().await.unwrap(), Some(25.5));

        let history = service.read_history(1).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].temperature, 25.5);

        // Without a target the heater is left alone
        assert_eq!(device.pin(43), None);
    }

    #[tokio::test]
    async fn test_thermostat_follows_target() {
        let device = MockDevice::new();
        let service = setup(&device, Some(26.0)).await;

        device.set_temperature(24.0);
        service.sample().await.unwrap();
        assert_eq!(device.pin(43), Some(0.0));

        device.set_temperature(27.0);
        service.sample().await.unwrap();
        assert_eq!(device.pin(43), Some(1.0));

        device.set_temperature(-1.0);
        service.sample().await.unwrap();
        assert_eq!(device.pin(43), Some(1.0));
    }
}
