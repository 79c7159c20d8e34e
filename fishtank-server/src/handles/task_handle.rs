use std::sync::Arc;

use anyhow::anyhow;
use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{middleware, Extension, Form, Json, Router};
use fishtank_api::models::*;

use crate::errors::ApiError;
use crate::handles::form_body;
use crate::middlewares::{auth, TokenState};
use crate::services::{TaskService, TokenClaims};

#[derive(Clone)]
pub struct ScheduleState {
    pub task_service: Arc<TaskService>,
}

pub fn task_router(schedule_state: ScheduleState, token_state: TokenState) -> Router {
    Router::new()
        .route("/fish/func/replaceWater", post(replace_water))
        .route("/fish/task/fetch", post(fetch_tasks))
        .route("/fish/periodic/add", post(add_periodic_task))
        .route("/fish/periodic/fetch", post(fetch_periodic_tasks))
        .route("/fish/periodic/delete", post(delete_periodic_task))
        .route_layer(middleware::from_fn_with_state(token_state, auth))
        .with_state(schedule_state)
}

#[utoipa::path(
    post,
    path = "/fish/func/replaceWater",
    tag = "task",
    request_body(content = ReplaceWaterRequest, content_type = "application/x-www-form-urlencoded"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Replacement scheduled", body = Vec<TaskResponse>),
        (status = 400, description = "Percentage outside (0, 0.5]"),
        (status = 401, description = "Unauthorized"),
        (status = 429, description = "Water was replaced less than an hour ago"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn replace_water(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<ScheduleState>,
    form: Result<Form<ReplaceWaterRequest>, FormRejection>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let body = form_body(form)?;

    let tasks = state
        .task_service
        .replace_water(body.percentage, Some(&token_data.sub))
        .await?;

    let tasks = tasks
        .into_iter()
        .map(TaskResponse::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow!(e))?;

    Ok(Json(tasks))
}

#[utoipa::path(
    post,
    path = "/fish/task/fetch",
    tag = "task",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Tasks created by the caller", body = Vec<TaskResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn fetch_tasks(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<ScheduleState>,
) -> Result<Json<Vec<TaskResponse>>, ApiError> {
    let tasks = state.task_service.fetch_tasks(&token_data.sub).await?;

    let tasks = tasks
        .into_iter()
        .map(TaskResponse::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow!(e))?;

    Ok(Json(tasks))
}

#[utoipa::path(
    post,
    path = "/fish/periodic/add",
    tag = "task",
    request_body(content = CreatePeriodicTaskRequest, content_type = "application/x-www-form-urlencoded"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Periodic task saved", body = bool),
        (status = 400, description = "Invalid type or time of day"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn add_periodic_task(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<ScheduleState>,
    form: Result<Form<CreatePeriodicTaskRequest>, FormRejection>,
) -> Result<Json<bool>, ApiError> {
    let body = form_body(form)?;

    state.task_service.add_periodic_task(&token_data.sub, &body).await?;

    Ok(Json(true))
}

#[utoipa::path(
    post,
    path = "/fish/periodic/fetch",
    tag = "task",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Periodic tasks of the caller", body = Vec<PeriodicTaskResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn fetch_periodic_tasks(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<ScheduleState>,
) -> Result<Json<Vec<PeriodicTaskResponse>>, ApiError> {
    let tasks = state.task_service.fetch_periodic_tasks(&token_data.sub).await?;

    let tasks = tasks
        .into_iter()
        .map(PeriodicTaskResponse::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow!(e))?;

    Ok(Json(tasks))
}

#[utoipa::path(
    post,
    path = "/fish/periodic/delete",
    tag = "task",
    request_body(content = DeletePeriodicTaskRequest, content_type = "application/x-www-form-urlencoded"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "`true` when deleted, `false` when owned by someone else", body = bool),
        (status = 400, description = "Missing or unknown periodic task"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_periodic_task(
    Extension(token_data): Extension<TokenClaims>,
    State(state): State<ScheduleState>,
    form: Result<Form<DeletePeriodicTaskRequest>, FormRejection>,
) -> Result<Json<bool>, ApiError> {
    let body = form_body(form)?;

    let deleted = state.task_service.delete_periodic_task(&token_data.sub, body.id).await?;

    Ok(Json(deleted))
}
