mod periodic_task;
mod periodic_task_run;
mod task;
mod temperature;

pub use periodic_task::{PeriodicTask, PeriodicTaskTable};
pub use periodic_task_run::PeriodicTaskRunTable;
pub use task::{Task, TaskTable};
pub use temperature::{Temperature, TemperatureTable};

pub trait Table {
    /// The name of the table
    fn name(&self) -> &'static str;

    /// The SQL statement to create the table
    fn create(&self) -> String;

    /// The SQL statement to dispose the table
    fn dispose(&self) -> String;

    /// The dependencies of the table
    fn dependencies(&self) -> Vec<&'static str>;
}
