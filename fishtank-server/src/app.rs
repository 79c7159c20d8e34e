use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::configs::{Settings, Storage};
use crate::handles::*;
use crate::middlewares::TokenState;
use crate::repositories::{PeriodicTaskRepository, TaskRepository, TemperatureRepository};
use crate::services::serial::SerialConnector;
use crate::services::{
    ActuatorService, DeviceLink, LinkConfig, TaskService, TemperatureService, TokenService,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        enable_board_led,
        enable_out_water,
        enable_in_water,
        enable_pump,
        enable_light,
        enable_purifier,
        enable_heater,
        read_in_water,
        read_out_water,
        read_heater,
        set_brightness,
        read_brightness,
        read_temperature,
        read_temperature_history,
        replace_water,
        fetch_tasks,
        add_periodic_task,
        fetch_periodic_tasks,
        delete_periodic_task,
    ),
    tags(
        (name = "fish", description = "Actuators and sensors of the tank"),
        (name = "task", description = "Scheduled and periodic tasks")
    )
)]
pub struct ApiDoc;

/// Long-lived services shared by the router and the background loops.
#[derive(Clone)]
pub struct Services {
    pub device_link: Arc<DeviceLink>,
    pub actuator_service: Arc<ActuatorService>,
    pub task_service: Arc<TaskService>,
    pub temperature_service: Arc<TemperatureService>,
    pub token_service: Arc<TokenService>,
}

impl Services {
    pub fn new(
        settings: &Settings,
        storage: Arc<Storage>,
        connector: Arc<dyn SerialConnector>,
        port_name: impl Into<String>,
    ) -> Self {
        let device_link = Arc::new(DeviceLink::new(
            connector,
            port_name,
            LinkConfig::from(&settings.device),
        ));
        let actuator_service = Arc::new(ActuatorService::new(device_link.clone()));

        let task_service = Arc::new(TaskService::new(
            Arc::new(TaskRepository::new(storage.clone())),
            Arc::new(PeriodicTaskRepository::new(storage.clone())),
            actuator_service.clone(),
            settings.tank.clone(),
            settings.scheduler.clone(),
        ));

        let temperature_service = Arc::new(TemperatureService::new(
            actuator_service.clone(),
            Arc::new(TemperatureRepository::new(storage.clone())),
            settings.scheduler.temperature_interval(),
            settings.scheduler.target_temperature,
        ));

        let token_service = Arc::new(TokenService::new(settings.auth.clone()));

        Self {
            device_link,
            actuator_service,
            task_service,
            temperature_service,
            token_service,
        }
    }
}

pub fn create_app(services: &Services) -> Router {
    let token_state = TokenState {
        token_service: services.token_service.clone(),
    };

    let fish = fish_router(
        FishState {
            actuator_service: services.actuator_service.clone(),
            temperature_service: services.temperature_service.clone(),
        },
        token_state.clone(),
    );

    let tasks = task_router(
        ScheduleState {
            task_service: services.task_service.clone(),
        },
        token_state,
    );

    Router::new()
        .merge(health_router())
        .merge(fish)
        .merge(tasks)
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
