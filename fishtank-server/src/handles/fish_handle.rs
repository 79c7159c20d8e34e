use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{middleware, Form, Json, Router};
use fishtank_api::models::*;

use crate::errors::ApiError;
use crate::handles::form_body;
use crate::middlewares::{auth, TokenState};
use crate::services::{ActuatorService, Relay, TemperatureService};

#[derive(Clone)]
pub struct FishState {
    pub actuator_service: Arc<ActuatorService>,
    pub temperature_service: Arc<TemperatureService>,
}

pub fn fish_router(fish_state: FishState, token_state: TokenState) -> Router {
    Router::new()
        .route("/fish/boardLed", post(enable_board_led))
        .route("/fish/outWater", post(enable_out_water))
        .route("/fish/inWater", post(enable_in_water))
        .route("/fish/pump", post(enable_pump))
        .route("/fish/light", post(enable_light))
        .route("/fish/purifier", post(enable_purifier))
        .route("/fish/heater", post(enable_heater))
        .route("/fish/read/inWater", post(read_in_water))
        .route("/fish/read/outWater", post(read_out_water))
        .route("/fish/read/heater", post(read_heater))
        .route("/fish/brightness", post(set_brightness))
        .route("/fish/brightness/read", post(read_brightness))
        .route("/fish/temperature", post(read_temperature))
        .route("/fish/readDBTemperature", post(read_temperature_history))
        .route_layer(middleware::from_fn_with_state(token_state, auth))
        .with_state(fish_state)
}

/// Unauthenticated liveness probe.
pub fn health_router() -> Router {
    Router::new().route("/fish/test", get(health))
}

#[utoipa::path(
    get,
    path = "/fish/test",
    tag = "fish",
    responses(
        (status = 200, description = "Server is running", body = String)
    )
)]
pub async fn health() -> &'static str {
    "fish tank is running"
}

async fn switch(
    state: &FishState,
    relay: Relay,
    form: Result<Form<EnableRequest>, FormRejection>,
) -> Result<Json<ControlResponse>, ApiError> {
    let body = form_body(form)?;

    state.actuator_service.switch(relay, body.enable).await?;

    Ok(Json(ControlResponse::success()))
}

#[utoipa::path(
    post,
    path = "/fish/boardLed",
    tag = "fish",
    request_body(content = EnableRequest, content_type = "application/x-www-form-urlencoded"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Board LED switched", body = ControlResponse),
        (status = 400, description = "Invalid request parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Device unreachable")
    )
)]
pub async fn enable_board_led(
    State(state): State<FishState>,
    form: Result<Form<EnableRequest>, FormRejection>,
) -> Result<Json<ControlResponse>, ApiError> {
    switch(&state, Relay::BOARD_LED, form).await
}

#[utoipa::path(
    post,
    path = "/fish/outWater",
    tag = "fish",
    request_body(content = EnableRequest, content_type = "application/x-www-form-urlencoded"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Out water valve opened or closed", body = ControlResponse),
        (status = 400, description = "Invalid request parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Device unreachable")
    )
)]
pub async fn enable_out_water(
    State(state): State<FishState>,
    form: Result<Form<EnableRequest>, FormRejection>,
) -> Result<Json<ControlResponse>, ApiError> {
    switch(&state, Relay::OUT_WATER_VALVE, form).await
}

#[utoipa::path(
    post,
    path = "/fish/inWater",
    tag = "fish",
    request_body(content = EnableRequest, content_type = "application/x-www-form-urlencoded"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "In water valve opened or closed", body = ControlResponse),
        (status = 400, description = "Invalid request parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Device unreachable")
    )
)]
pub async fn enable_in_water(
    State(state): State<FishState>,
    form: Result<Form<EnableRequest>, FormRejection>,
) -> Result<Json<ControlResponse>, ApiError> {
    switch(&state, Relay::IN_WATER_VALVE, form).await
}

#[utoipa::path(
    post,
    path = "/fish/pump",
    tag = "fish",
    request_body(content = EnableRequest, content_type = "application/x-www-form-urlencoded"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Pump switched", body = ControlResponse),
        (status = 400, description = "Invalid request parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Device unreachable")
    )
)]
pub async fn enable_pump(
    State(state): State<FishState>,
    form: Result<Form<EnableRequest>, FormRejection>,
) -> Result<Json<ControlResponse>, ApiError> {
    switch(&state, Relay::PUMP, form).await
}

#[utoipa::path(
    post,
    path = "/fish/light",
    tag = "fish",
    request_body(content = EnableRequest, content_type = "application/x-www-form-urlencoded"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Light switched", body = ControlResponse),
        (status = 400, description = "Invalid request parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Device unreachable")
    )
)]
pub async fn enable_light(
    State(state): State<FishState>,
    form: Result<Form<EnableRequest>, FormRejection>,
) -> Result<Json<ControlResponse>, ApiError> {
    switch(&state, Relay::LIGHT, form).await
}

#[utoipa::path(
    post,
    path = "/fish/purifier",
    tag = "fish",
    request_body(content = EnableRequest, content_type = "application/x-www-form-urlencoded"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Purifier switched", body = ControlResponse),
        (status = 400, description = "Invalid request parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Device unreachable")
    )
)]
pub async fn enable_purifier(
    State(state): State<FishState>,
    form: Result<Form<EnableRequest>, FormRejection>,
) -> Result<Json<ControlResponse>, ApiError> {
    switch(&state, Relay::PURIFIER, form).await
}

#[utoipa::path(
    post,
    path = "/fish/heater",
    tag = "fish",
    request_body(content = EnableRequest, content_type = "application/x-www-form-urlencoded"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Heater switched", body = ControlResponse),
        (status = 400, description = "Invalid request parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Device unreachable")
    )
)]
pub async fn enable_heater(
    State(state): State<FishState>,
    form: Result<Form<EnableRequest>, FormRejection>,
) -> Result<Json<ControlResponse>, ApiError> {
    switch(&state, Relay::HEATER, form).await
}

#[utoipa::path(
    post,
    path = "/fish/read/inWater",
    tag = "fish",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Whether the in water valve is open", body = bool),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Device unreachable")
    )
)]
pub async fn read_in_water(State(state): State<FishState>) -> Result<Json<bool>, ApiError> {
    Ok(Json(state.actuator_service.is_in_water_valve_open().await?))
}

#[utoipa::path(
    post,
    path = "/fish/read/outWater",
    tag = "fish",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Whether the out water valve is open", body = bool),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Device unreachable")
    )
)]
pub async fn read_out_water(State(state): State<FishState>) -> Result<Json<bool>, ApiError> {
    Ok(Json(state.actuator_service.is_out_water_valve_open().await?))
}

#[utoipa::path(
    post,
    path = "/fish/read/heater",
    tag = "fish",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Whether the heater is on", body = bool),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Device unreachable")
    )
)]
pub async fn read_heater(State(state): State<FishState>) -> Result<Json<bool>, ApiError> {
    Ok(Json(state.actuator_service.is_heater_on().await?))
}

#[utoipa::path(
    post,
    path = "/fish/brightness",
    tag = "fish",
    request_body(content = PercentageRequest, content_type = "application/x-www-form-urlencoded"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Brightness applied", body = ControlResponse),
        (status = 400, description = "Invalid request parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Device unreachable")
    )
)]
pub async fn set_brightness(
    State(state): State<FishState>,
    form: Result<Form<PercentageRequest>, FormRejection>,
) -> Result<Json<ControlResponse>, ApiError> {
    let body = form_body(form)?;

    state.actuator_service.set_brightness(body.percentage).await?;

    Ok(Json(ControlResponse::success()))
}

#[utoipa::path(
    post,
    path = "/fish/brightness/read",
    tag = "fish",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current brightness in 0..=1", body = f32),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Device unreachable")
    )
)]
pub async fn read_brightness(State(state): State<FishState>) -> Result<Json<f32>, ApiError> {
    Ok(Json(state.actuator_service.read_brightness().await?))
}

#[utoipa::path(
    post,
    path = "/fish/temperature",
    tag = "fish",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Live water temperature", body = f32),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Device unreachable")
    )
)]
pub async fn read_temperature(State(state): State<FishState>) -> Result<Json<f32>, ApiError> {
    Ok(Json(state.actuator_service.read_temperature().await?))
}

#[utoipa::path(
    post,
    path = "/fish/readDBTemperature",
    tag = "fish",
    request_body(content = HistoryRequest, content_type = "application/x-www-form-urlencoded"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Stored readings of the last days", body = Vec<TemperatureResponse>),
        (status = 400, description = "Invalid request parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn read_temperature_history(
    State(state): State<FishState>,
    form: Result<Form<HistoryRequest>, FormRejection>,
) -> Result<Json<Vec<TemperatureResponse>>, ApiError> {
    let body = form_body(form)?;

    let records = state.temperature_service.read_history(body.days).await?;

    Ok(Json(records.into_iter().map(TemperatureResponse::from).collect()))
}
