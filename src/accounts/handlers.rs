use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    accounts::{
        dto::{
            AuthResponse, DeviceTokenRequest, LoginRequest, MeResponse, RegisterRequest,
            SettingsPatch, SettingsResponse,
        },
        jwt::AuthUser,
        services,
    },
    error::AppError,
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(register))
        .route("/sessions", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/settings", put(update_settings))
        .route("/me/device-token", put(update_device_token))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let Json(payload) = payload?;
    let response = services::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let Json(payload) = payload?;
    Ok(Json(services::login(&state, payload).await?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MeResponse>, AppError> {
    let user = services::current_user(&state, user_id).await?;
    Ok(Json(MeResponse { user }))
}

#[instrument(skip(state, payload))]
pub async fn update_settings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<SettingsPatch>, JsonRejection>,
) -> Result<Json<SettingsResponse>, AppError> {
    let Json(patch) = payload?;
    let user = services::update_settings(&state, user_id, patch).await?;
    Ok(Json(SettingsResponse {
        message: "Settings updated successfully",
        user,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_device_token(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<DeviceTokenRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(payload) = payload?;
    services::update_device_token(&state, user_id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}
