use fishtank_api::models::{TaskResponse, TaskState, TaskType, UnknownVariant};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::models::Table;

/// A one-shot actuator command waiting for its execute time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i32,
    /// Empty for tasks generated by the scheduler
    pub user_id: Option<String>,
    pub task_type: String,
    pub data: i32,
    pub execute_time: OffsetDateTime,
    pub state: String,
}

impl Task {
    pub fn new(task_type: TaskType, data: i32, execute_time: OffsetDateTime, user_id: Option<String>) -> Self {
        Self {
            id: 0,
            user_id,
            task_type: task_type.to_string(),
            data,
            execute_time,
            state: TaskState::Standby.to_string(),
        }
    }

    pub fn kind(&self) -> Result<TaskType, UnknownVariant> {
        self.task_type.parse()
    }
}

impl TryFrom<Task> for TaskResponse {
    type Error = UnknownVariant;

    fn try_from(task: Task) -> Result<Self, Self::Error> {
        Ok(TaskResponse {
            id: task.id,
            task_type: task.task_type.parse()?,
            state: task.state.parse()?,
            user_id: task.user_id,
            data: task.data,
            execute_time: task.execute_time,
        })
    }
}

#[derive(Clone)]
pub struct TaskTable;

impl Table for TaskTable {
    fn name(&self) -> &'static str {
        "tasks"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT,
                task_type TEXT NOT NULL,
                data INTEGER NOT NULL,
                execute_time TIMESTAMP NOT NULL,
                state TEXT NOT NULL DEFAULT 'standby'
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_due ON tasks (state, execute_time, id);
            "#
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS tasks;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
