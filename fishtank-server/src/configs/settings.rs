use std::env;
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::configs::normalize_path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub migration_path: Option<String>,
    pub clean_start: bool,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auth {
    pub secret: String,
    pub expiration: u64,
}

/// Serial link to the tank controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    /// First enumerated port is used when absent
    pub port_path: Option<String>,
    pub baud_rate: u32,
    pub client_id: u32,
    pub read_attempts: u32,
    pub read_interval_ms: u64,
    pub repair_cooldown_ms: u64,
    pub max_retries: u32,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            port_path: None,
            baud_rate: 57600,
            client_id: 56432,
            read_attempts: 500,
            read_interval_ms: 10,
            repair_cooldown_ms: 2000,
            max_retries: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tank {
    pub volume_ml: f64,
    pub outflow_ml_per_minute: f64,
}

impl Default for Tank {
    fn default() -> Self {
        Self {
            volume_ml: 100_000.0,
            outflow_ml_per_minute: 578.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scheduler {
    pub poll_interval_ms: u64,
    pub temperature_interval_secs: u64,
    /// Offset of the tank's local wall clock, used for periodic task times
    pub utc_offset_minutes: i32,
    /// Heater is driven toward this temperature when set
    pub target_temperature: Option<f32>,
}

impl Scheduler {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn temperature_interval(&self) -> Duration {
        Duration::from_secs(self.temperature_interval_secs)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3000,
            temperature_interval_secs: 300,
            utc_offset_minutes: 0,
            target_temperature: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub database: Database,
    pub auth: Auth,
    #[serde(default)]
    pub device: Device,
    #[serde(default)]
    pub tank: Tank,
    #[serde(default)]
    pub scheduler: Scheduler,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        let mut settings: Settings = Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        if let Some(migrate) = &settings.database.migration_path {
            if Path::new(migrate).is_dir() {
                let migrate_path = normalize_path(migrate)
                    .map_err(|e| ConfigError::Message(e.to_string()))?
                    .to_string_lossy()
                    .to_string();

                settings.database.migration_path = Some(migrate_path);
            } else {
                tracing::warn!("migration path {} is not a directory, skipping migrations", migrate);
                settings.database.migration_path = None;
            }
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file_parses() {
        let content = include_str!("../../configs/default.toml");
        let settings: Settings = toml::from_str(content).unwrap();

        assert_eq!(settings.device.baud_rate, 57600);
        assert_eq!(settings.device.client_id, 56432);
        assert_eq!(settings.device.max_retries, 5);
        assert_eq!(settings.tank.volume_ml, 100_000.0);
        assert_eq!(settings.scheduler.poll_interval(), Duration::from_secs(3));
        assert!(settings.device.port_path.is_none());
    }

    #[test]
    fn test_missing_sections_fall_back_to_firmware_defaults() {
        let content = r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [logger]
            level = "debug"

            [database]
            url = "sqlite::memory:"
            clean_start = true

            [auth]
            secret = "test"
            expiration = 60

            [device]
            port_path = "/dev/ttyACM0"
        "#;
        let settings: Settings = toml::from_str(content).unwrap();

        assert_eq!(settings.device.port_path.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(settings.device.read_attempts, 500);
        assert_eq!(settings.device.repair_cooldown_ms, 2000);
        assert_eq!(settings.tank.outflow_ml_per_minute, 578.0);
        assert_eq!(settings.scheduler.temperature_interval(), Duration::from_secs(300));
        assert!(settings.scheduler.target_temperature.is_none());
    }
}
