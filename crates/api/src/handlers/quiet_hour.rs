//! Handlers for the `/quiet-hours` resource.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use quiet_core::quiet_hour::QuietHourInput;
use quiet_core::types::DbId;
use quiet_db::models::quiet_hour::QuietHour;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// POST /api/v1/quiet-hours
pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<QuietHourInput>, JsonRejection>,
) -> AppResult<(StatusCode, Json<QuietHour>)> {
    let Json(input) = payload?;
    let window = state
        .windows
        .create(user.user_id, &input, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(window)))
}

/// GET /api/v1/quiet-hours
pub async fn list(user: AuthUser, State(state): State<AppState>) -> AppResult<Json<Vec<QuietHour>>> {
    let windows = state.windows.list(user.user_id).await?;
    Ok(Json(windows))
}

/// GET /api/v1/quiet-hours/{id}
pub async fn get_by_id(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<QuietHour>> {
    let window = state.windows.get(user.user_id, id).await?;
    Ok(Json(window))
}

/// PUT /api/v1/quiet-hours/{id}
pub async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    payload: Result<Json<QuietHourInput>, JsonRejection>,
) -> AppResult<Json<QuietHour>> {
    let Json(input) = payload?;
    let window = state.windows.update(user.user_id, id, &input).await?;
    Ok(Json(window))
}

/// DELETE /api/v1/quiet-hours/{id}
pub async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.windows.cancel(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
