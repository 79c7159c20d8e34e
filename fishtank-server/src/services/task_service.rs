use std::sync::Arc;

use fishtank_api::models::{
    format_time_of_day, parse_time_of_day, CreatePeriodicTaskRequest, TaskState, TaskType, DATA_CLOSE, DATA_OPEN,
};
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::configs::{Scheduler, Tank};
use crate::errors::{DeviceError, TaskError};
use crate::models::{PeriodicTask, Task};
use crate::repositories::{PeriodicTaskRepository, TaskRepository};
use crate::services::{truncate_to_second, ActuatorService};

/// Largest share of the tank one replacement may drain
pub const MAX_REPLACE_RATIO: f32 = 0.5;

/// Minimum spacing between two water replacements
pub const REPLACE_WATER_COOLDOWN: Duration = Duration::HOUR;

pub struct TaskService {
    task_repository: Arc<TaskRepository>,
    periodic_task_repository: Arc<PeriodicTaskRepository>,
    actuator_service: Arc<ActuatorService>,
    tank: Tank,
    scheduler: Scheduler,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    /// Held across the rate-limit check and the insert of a water replacement
    replace_water_lock: Mutex<()>,
}

impl TaskService {
    pub fn new(
        task_repository: Arc<TaskRepository>,
        periodic_task_repository: Arc<PeriodicTaskRepository>,
        actuator_service: Arc<ActuatorService>,
        tank: Tank,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            task_repository,
            periodic_task_repository,
            actuator_service,
            tank,
            scheduler,
            stop_tx: Mutex::new(None),
            handles: Mutex::new(Vec::new()),
            replace_water_lock: Mutex::new(()),
        }
    }

    fn local_offset(&self) -> UtcOffset {
        UtcOffset::from_whole_seconds(self.scheduler.utc_offset_minutes * 60).unwrap_or(UtcOffset::UTC)
    }

    /// Spawns the poll loop and the midnight materializer.
    pub async fn start(self: &Arc<Self>) {
        let mut stop_tx = self.stop_tx.lock().await;
        if stop_tx.is_some() {
            tracing::warn!("Task service already running");
            return;
        }

        let (tx, rx) = watch::channel(false);
        *stop_tx = Some(tx);

        let poller = tokio::spawn(self.clone().poll_loop(rx.clone()));
        let materializer = tokio::spawn(self.clone().materialize_loop(rx));
        self.handles.lock().await.extend([poller, materializer]);

        tracing::info!("Task service started, polling every {:?}", self.scheduler.poll_interval());
    }

    /// Stops both loops and waits for them to finish.
    pub async fn stop(&self) {
        let Some(stop_tx) = self.stop_tx.lock().await.take() else {
            return;
        };
        let _ = stop_tx.send(true);

        for handle in self.handles.lock().await.drain(..) {
            if let Err(e) = handle.await {
                tracing::error!("Task loop ended abnormally: {}", e);
            }
        }

        tracing::info!("Task service stopped");
    }

    async fn poll_loop(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        loop {
            if let Err(e) = self.tick().await {
                tracing::error!("Task poll failed: {}", e);
            }

            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = tokio::time::sleep(self.scheduler.poll_interval()) => {}
            }
        }
    }

    async fn materialize_loop(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        loop {
            let now = OffsetDateTime::now_utc();
            let Some((date, wait)) = next_local_midnight(now, self.local_offset()) else {
                tracing::error!("No local midnight after {}", now);
                break;
            };

            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            if let Err(e) = self.materialize(date).await {
                tracing::error!("Failed to materialize periodic tasks for {}: {}", date, e);
            }
        }
    }

    pub async fn tick(&self) -> Result<Option<Task>, TaskError> {
        self.tick_at(OffsetDateTime::now_utc()).await
    }

    /// Executes the single most overdue task, if any. A failing device command
    /// is logged and the task still completes.
    pub async fn tick_at(&self, now: OffsetDateTime) -> Result<Option<Task>, TaskError> {
        let Some(mut task) = self.task_repository.find_next_due(truncate_to_second(now)).await? else {
            return Ok(None);
        };

        match task.kind() {
            Ok(task_type) => {
                if let Err(e) = self.dispatch(task_type, task.data).await {
                    tracing::warn!("Task {} ({}) failed: {}", task.id, task_type, e);
                }
            }
            Err(e) => tracing::error!("Task {} skipped: {}", task.id, e),
        }

        let mut tx = self.task_repository.get_storage().begin().await?;
        self.task_repository.update_state(task.id, TaskState::Finished, &mut tx).await?;
        tx.commit().await?;

        task.state = TaskState::Finished.to_string();

        Ok(Some(task))
    }

    async fn dispatch(&self, task_type: TaskType, data: i32) -> Result<(), DeviceError> {
        let engage = data == DATA_OPEN;
        let actuator = &self.actuator_service;

        match task_type {
            TaskType::ReplaceWater => {
                tracing::info!("Water replacement of {}% started", data);
                Ok(())
            }
            TaskType::ValveInWater => actuator.enable_in_water_valve(engage).await,
            TaskType::ValveOutWater => actuator.enable_out_water_valve(engage).await,
            TaskType::Light => actuator.enable_light(engage).await,
            TaskType::Purifier => actuator.enable_purifier(engage).await,
            TaskType::Heater => actuator.enable_heater(engage).await,
            TaskType::Pump => actuator.enable_pump(engage).await,
            TaskType::Brightness => actuator.set_brightness(data as f32 / 100.0).await,
        }
    }

    pub async fn replace_water(&self, ratio: f32, user_id: Option<&str>) -> Result<Vec<Task>, TaskError> {
        self.replace_water_at(ratio, user_id, OffsetDateTime::now_utc()).await
    }

    /// Schedules draining `ratio` of the tank and refilling it afterwards.
    ///
    /// The in valve closes and the out valve opens at `now`. Once the outflow time
    /// has passed the out valve closes and, one second later, the in valve reopens.
    pub async fn replace_water_at(
        &self,
        ratio: f32,
        user_id: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<Vec<Task>, TaskError> {
        if !(ratio > 0.0 && ratio <= MAX_REPLACE_RATIO) {
            return Err(TaskError::InvalidParameter(format!(
                "percentage must be within (0, {}], got {}",
                MAX_REPLACE_RATIO, ratio
            )));
        }

        let now = truncate_to_second(now);
        let _guard = self.replace_water_lock.lock().await;

        if let Some(last) = self.task_repository.find_latest_by_type(TaskType::ReplaceWater).await? {
            if last.execute_time > now - REPLACE_WATER_COOLDOWN {
                tracing::info!("Rejected water replacement, last one at {}", last.execute_time);
                return Err(TaskError::RateLimited);
            }
        }

        let outflow = Duration::seconds(self.outflow_seconds(ratio));
        let user_id = user_id.map(str::to_string);
        let percent = (ratio * 100.0).round() as i32;

        let mut tasks = vec![
            Task::new(TaskType::ReplaceWater, percent, now, user_id.clone()),
            Task::new(TaskType::ValveInWater, DATA_CLOSE, now, user_id.clone()),
            Task::new(TaskType::ValveOutWater, DATA_OPEN, now, user_id.clone()),
            Task::new(TaskType::ValveOutWater, DATA_CLOSE, now + outflow, user_id.clone()),
            Task::new(TaskType::ValveInWater, DATA_OPEN, now + outflow + Duration::SECOND, user_id),
        ];

        let mut tx = self.task_repository.get_storage().begin().await?;
        for task in tasks.iter_mut() {
            task.id = self.task_repository.create(task, &mut tx).await?;
        }
        tx.commit().await?;

        tracing::info!("Scheduled water replacement of {}%, draining for {}s", percent, outflow.whole_seconds());

        Ok(tasks)
    }

    /// Seconds the out valve stays open to drain `ratio` of the tank.
    pub fn outflow_seconds(&self, ratio: f32) -> i64 {
        (self.tank.volume_ml * ratio as f64 / self.tank.outflow_ml_per_minute * 60.0) as i64
    }

    pub async fn fetch_tasks(&self, user_id: &str) -> Result<Vec<Task>, TaskError> {
        Ok(self.task_repository.find_by_user_id(user_id).await?)
    }

    pub async fn add_periodic_task(
        &self,
        user_id: &str,
        request: &CreatePeriodicTaskRequest,
    ) -> Result<PeriodicTask, TaskError> {
        let time = parse_time_of_day(&request.time)
            .map_err(|e| TaskError::InvalidTime(format!("{}: {}", request.time, e)))?;

        let mut task = PeriodicTask {
            id: 0,
            user_id: user_id.to_string(),
            task_type: request.task_type.to_string(),
            data: request.data,
            time: format_time_of_day(time),
        };

        let mut tx = self.task_repository.get_storage().begin().await?;
        task.id = self.periodic_task_repository.create(&task, &mut tx).await?;
        tx.commit().await?;

        Ok(task)
    }

    pub async fn fetch_periodic_tasks(&self, user_id: &str) -> Result<Vec<PeriodicTask>, TaskError> {
        Ok(self.periodic_task_repository.find_by_user_id(user_id).await?)
    }

    /// Deletes a template owned by `user_id`. Returns `false` for someone else's
    /// template.
    pub async fn delete_periodic_task(&self, user_id: &str, id: i32) -> Result<bool, TaskError> {
        let task = self
            .periodic_task_repository
            .find_by_id(id)
            .await?
            .ok_or(TaskError::PeriodicTaskNotFound)?;

        if task.user_id != user_id {
            return Ok(false);
        }

        let mut tx = self.task_repository.get_storage().begin().await?;
        self.periodic_task_repository.delete(id, &mut tx).await?;
        tx.commit().await?;

        Ok(true)
    }

    /// Copies every periodic template into a standby task on `date`.
    ///
    /// Each date is materialized at most once; later calls for the same date
    /// return 0.
    pub async fn materialize(&self, date: Date) -> Result<usize, TaskError> {
        let offset = self.local_offset();
        let templates = self.periodic_task_repository.find_all().await?;

        let mut tx = self.task_repository.get_storage().begin().await?;

        if !self
            .periodic_task_repository
            .claim_run(date, truncate_to_second(OffsetDateTime::now_utc()), &mut tx)
            .await?
        {
            tracing::info!("Periodic tasks for {} already materialized", date);
            return Ok(0);
        }

        let mut created = 0;
        for template in templates {
            let time = match parse_time_of_day(&template.time) {
                Ok(time) => time,
                Err(e) => {
                    tracing::warn!("Skipping periodic task {} with time {}: {}", template.id, template.time, e);
                    continue;
                }
            };

            let execute_time = PrimitiveDateTime::new(date, time)
                .assume_offset(offset)
                .to_offset(UtcOffset::UTC);

            let task = Task {
                id: 0,
                user_id: Some(template.user_id),
                task_type: template.task_type,
                data: template.data,
                execute_time,
                state: TaskState::Standby.to_string(),
            };

            self.task_repository.create(&task, &mut tx).await?;
            created += 1;
        }

        tx.commit().await?;

        tracing::info!("Materialized {} periodic tasks for {}", created, date);

        Ok(created)
    }
}

/// The next local date to start and how long until its midnight.
fn next_local_midnight(now: OffsetDateTime, offset: UtcOffset) -> Option<(Date, std::time::Duration)> {
    let next_date = now.to_offset(offset).date().next_day()?;
    let midnight = next_date.midnight().assume_offset(offset);
    let wait = std::time::Duration::try_from(midnight - now).unwrap_or_default();

    Some((next_date, wait))
}
