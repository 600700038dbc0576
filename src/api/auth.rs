use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

use super::error::ApiResult;
use crate::auth::Claims;
use crate::infrastructure::AppState;
use crate::services::auth_service;
use crate::services::student_service::{self, RegisterStudentInput};

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RefreshRequest {
    refresh_token: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access and refresh tokens"),
        (status = 401, description = "Invalid credentials", body = super::error::ErrorBody),
        (status = 403, description = "Account blocked or inactive", body = super::error::ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let pair =
        auth_service::login(state.db(), &state.config, &payload.username, &payload.password)
            .await?;
    Ok(Json(json!({ "success": true, "data": pair })))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<Value>> {
    let pair = auth_service::refresh(state.db(), &state.config, &payload.refresh_token).await?;
    Ok(Json(json!({ "success": true, "data": pair })))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> ApiResult<Json<Value>> {
    auth_service::revoke(state.db(), &payload.refresh_token).await?;
    Ok(Json(json!({ "success": true, "message": "Logged out" })))
}

/// Student self-registration; the account stays pending until approved.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterStudentInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let student =
        student_service::register_student(state.db(), state.activity.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Registration received, awaiting approval",
            "student": student,
        })),
    ))
}

pub async fn me(State(state): State<AppState>, claims: Claims) -> ApiResult<Json<Value>> {
    let current = auth_service::current_user(state.db(), claims.uid).await?;
    Ok(Json(json!({ "success": true, "user": current })))
}
