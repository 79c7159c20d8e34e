use crate::models::Table;

/// One row per local date whose periodic tasks have been materialized.
#[derive(Clone)]
pub struct PeriodicTaskRunTable;

impl Table for PeriodicTaskRunTable {
    fn name(&self) -> &'static str {
        "periodic_task_runs"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS periodic_task_runs (
                run_date DATE PRIMARY KEY,
                created_at TIMESTAMP NOT NULL
            );
            "#
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS periodic_task_runs;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
