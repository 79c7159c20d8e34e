use std::sync::Arc;

use sqlx::{Error, Sqlite, Transaction};
use time::{Date, OffsetDateTime};

use crate::configs::Storage;
use crate::models::PeriodicTask;

pub struct PeriodicTaskRepository {
    storage: Arc<Storage>,
}

impl PeriodicTaskRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl PeriodicTaskRepository {
    pub async fn create(
        &self,
        item: &PeriodicTask,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO periodic_tasks (user_id, task_type, data, time)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&item.user_id)
        .bind(&item.task_type)
        .bind(item.data)
        .bind(&item.time)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<PeriodicTask>, Error> {
        let task: Option<PeriodicTask> = sqlx::query_as("SELECT * FROM periodic_tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(task)
    }

    pub async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<PeriodicTask>, Error> {
        let tasks: Vec<PeriodicTask> = sqlx::query_as(
            "SELECT * FROM periodic_tasks WHERE user_id = $1 ORDER BY time ASC, id ASC",
        )
        .bind(user_id)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(tasks)
    }

    pub async fn find_all(&self) -> Result<Vec<PeriodicTask>, Error> {
        let tasks: Vec<PeriodicTask> = sqlx::query_as("SELECT * FROM periodic_tasks ORDER BY time ASC, id ASC")
            .fetch_all(self.storage.get_pool())
            .await?;

        Ok(tasks)
    }

    pub async fn delete(
        &self,
        id: i32,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query("DELETE FROM periodic_tasks WHERE id = $1")
            .bind(id)
            .execute(&mut **transaction)
            .await?;

        Ok(())
    }

    /// Claims `run_date` for materialization. Returns `false` when the date has
    /// already been claimed.
    pub async fn claim_run(
        &self,
        run_date: Date,
        now: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<bool, Error> {
        let affected = sqlx::query(
            "INSERT OR IGNORE INTO periodic_task_runs (run_date, created_at) VALUES ($1, $2)",
        )
        .bind(run_date)
        .bind(now)
        .execute(&mut **transaction)
        .await?
        .rows_affected();

        Ok(affected == 1)
    }
}
