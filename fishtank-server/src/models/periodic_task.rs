use fishtank_api::models::{PeriodicTaskResponse, UnknownVariant};
use serde::{Deserialize, Serialize};

use crate::models::Table;

/// Daily template turned into a [`Task`](crate::models::Task) every midnight.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PeriodicTask {
    pub id: i32,
    pub user_id: String,
    pub task_type: String,
    pub data: i32,
    /// Local wall-clock time, `HH:MM:SS`
    pub time: String,
}

impl TryFrom<PeriodicTask> for PeriodicTaskResponse {
    type Error = UnknownVariant;

    fn try_from(task: PeriodicTask) -> Result<Self, Self::Error> {
        Ok(PeriodicTaskResponse {
            id: task.id,
            task_type: task.task_type.parse()?,
            user_id: task.user_id,
            data: task.data,
            time: task.time,
        })
    }
}

#[derive(Clone)]
pub struct PeriodicTaskTable;

impl Table for PeriodicTaskTable {
    fn name(&self) -> &'static str {
        "periodic_tasks"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS periodic_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                task_type TEXT NOT NULL,
                data INTEGER NOT NULL,
                time TEXT NOT NULL
            );
            "#
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS periodic_tasks;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
