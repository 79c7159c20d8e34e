use std::sync::Arc;

use fishtank_api::models::{TaskState, TaskType};
use sqlx::{Error, Sqlite, Transaction};
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::Task;

pub struct TaskRepository {
    storage: Arc<Storage>,
}

impl TaskRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_storage(&self) -> &Arc<Storage> {
        &self.storage
    }
}

impl TaskRepository {
    pub async fn create(
        &self,
        item: &Task,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO tasks (user_id, task_type, data, execute_time, state)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&item.user_id)
        .bind(&item.task_type)
        .bind(item.data)
        .bind(item.execute_time)
        .bind(&item.state)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Task>, Error> {
        let task: Option<Task> = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(task)
    }

    pub async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<Task>, Error> {
        let tasks: Vec<Task> = sqlx::query_as(
            "SELECT * FROM tasks WHERE user_id = $1 ORDER BY execute_time ASC, id ASC",
        )
        .bind(user_id)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(tasks)
    }

    /// Oldest standby task whose execute time has been reached. Ties resolve by
    /// insertion order.
    pub async fn find_next_due(&self, now: OffsetDateTime) -> Result<Option<Task>, Error> {
        let task: Option<Task> = sqlx::query_as(
            r#"
            SELECT * FROM tasks
            WHERE state = $1 AND execute_time <= $2
            ORDER BY execute_time ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(TaskState::Standby.as_str())
        .bind(now)
        .fetch_optional(self.storage.get_pool())
        .await?;

        Ok(task)
    }

    pub async fn find_latest_by_type(&self, task_type: TaskType) -> Result<Option<Task>, Error> {
        let task: Option<Task> = sqlx::query_as(
            r#"
            SELECT * FROM tasks
            WHERE task_type = $1
            ORDER BY execute_time DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(task_type.as_str())
        .fetch_optional(self.storage.get_pool())
        .await?;

        Ok(task)
    }

    pub async fn update_state(
        &self,
        id: i32,
        state: TaskState,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE tasks SET state = $1 WHERE id = $2")
            .bind(state.as_str())
            .bind(id)
            .execute(&mut **transaction)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::configs::{Database, SchemaManager};

    use super::*;

    async fn setup_test_db() -> Arc<Storage> {
        Arc::new(
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
        )
    }

    async fn insert(repo: &TaskRepository, task: Task) -> i32 {
        let mut tx = repo.get_storage().begin().await.unwrap();
        let id = repo.create(&task, &mut tx).await.unwrap();
        tx.commit().await.unwrap();
        id
    }

    #[tokio::test]
    async fn test_create_and_find_task() {
        let storage = setup_test_db().await;
        let repo = TaskRepository::new(storage.clone());

        let id = insert(
            &repo,
            Task::new(TaskType::Light, 1, datetime!(2024-03-01 08:00:00 UTC), Some("alice".into())),
        )
        .await;

        let found = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.kind().unwrap(), TaskType::Light);
        assert_eq!(found.data, 1);
        assert_eq!(found.execute_time, datetime!(2024-03-01 08:00:00 UTC));
        assert_eq!(found.state, "standby");
        assert_eq!(found.user_id.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_find_next_due_orders_by_time_then_id() {
        let storage = setup_test_db().await;
        let repo = TaskRepository::new(storage.clone());
        let now = datetime!(2024-03-01 12:00:00 UTC);

        insert(&repo, Task::new(TaskType::Pump, 1, datetime!(2024-03-01 12:00:01 UTC), None)).await;
        let first = insert(&repo, Task::new(TaskType::Heater, 0, datetime!(2024-03-01 11:00:00 UTC), None)).await;
        let second = insert(&repo, Task::new(TaskType::Light, 1, datetime!(2024-03-01 11:00:00 UTC), None)).await;

        let due = repo.find_next_due(now).await.unwrap().unwrap();
        assert_eq!(due.id, first);

        let mut tx = storage.begin().await.unwrap();
        repo.update_state(first, TaskState::Finished, &mut tx).await.unwrap();
        tx.commit().await.unwrap();

        let due = repo.find_next_due(now).await.unwrap().unwrap();
        assert_eq!(due.id, second);

        let mut tx = storage.begin().await.unwrap();
        repo.update_state(second, TaskState::Finished, &mut tx).await.unwrap();
        tx.commit().await.unwrap();

        assert!(repo.find_next_due(now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_latest_by_type() {
        let storage = setup_test_db().await;
        let repo = TaskRepository::new(storage.clone());

        assert!(repo.find_latest_by_type(TaskType::ReplaceWater).await.unwrap().is_none());

        insert(&repo, Task::new(TaskType::ReplaceWater, 10, datetime!(2024-03-01 08:00:00 UTC), None)).await;
        let latest = insert(&repo, Task::new(TaskType::ReplaceWater, 20, datetime!(2024-03-02 08:00:00 UTC), None)).await;
        insert(&repo, Task::new(TaskType::Light, 1, datetime!(2024-03-03 08:00:00 UTC), None)).await;

        let found = repo.find_latest_by_type(TaskType::ReplaceWater).await.unwrap().unwrap();
        assert_eq!(found.id, latest);
        assert_eq!(found.data, 20);
    }
}
