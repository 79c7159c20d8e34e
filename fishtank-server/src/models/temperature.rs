use fishtank_api::models::TemperatureResponse;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::models::Table;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Temperature {
    pub id: i32,
    pub temperature: f32,
    pub time: OffsetDateTime,
}

impl From<Temperature> for TemperatureResponse {
    fn from(record: Temperature) -> Self {
        TemperatureResponse {
            id: record.id,
            temperature: record.temperature,
            time: record.time,
        }
    }
}

#[derive(Clone)]
pub struct TemperatureTable;

impl Table for TemperatureTable {
    fn name(&self) -> &'static str {
        "temperatures"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS temperatures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                temperature REAL NOT NULL,
                time TIMESTAMP NOT NULL
            );
            "#
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS temperatures;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
