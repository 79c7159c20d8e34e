mod periodic_task;
mod task;
mod temperature;

pub use periodic_task::PeriodicTaskRepository;
pub use task::TaskRepository;
pub use temperature::TemperatureRepository;
