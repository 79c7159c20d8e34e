use std::sync::Arc;

use sqlx::{Error, Sqlite, Transaction};
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::Temperature;

pub struct TemperatureRepository {
    storage: Arc<Storage>,
}

impl TemperatureRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_storage(&self) -> &Arc<Storage> {
        &self.storage
    }
}

impl TemperatureRepository {
    pub async fn create(
        &self,
        item: &Temperature,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i32, Error> {
        let id = sqlx::query("INSERT INTO temperatures (temperature, time) VALUES ($1, $2)")
            .bind(item.temperature)
            .bind(item.time)
            .execute(&mut **transaction)
            .await?
            .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find_since(&self, since: OffsetDateTime) -> Result<Vec<Temperature>, Error> {
        let records: Vec<Temperature> = sqlx::query_as(
            "SELECT * FROM temperatures WHERE time >= $1 ORDER BY time ASC, id ASC",
        )
        .bind(since)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(records)
    }
}
