use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::error::{ApiError, ApiResult};
use crate::auth::{AdminClaims, Claims};
use crate::domain::{MaintenancePriority, MaintenanceStatus};
use crate::infrastructure::AppState;
use crate::models::student;
use crate::services::maintenance_service::{self, CreateMaintenanceInput, MaintenanceFilter};
use crate::services::student_service;

#[derive(Deserialize)]
pub struct CreateMaintenanceRequest {
    pub room_id: i32,
    /// Ignored for students, who always file on their own behalf
    pub student_id: Option<i32>,
    pub title: String,
    pub description: String,
    pub priority: Option<MaintenancePriority>,
}

#[derive(Deserialize)]
pub struct MaintenanceStatusRequest {
    pub status: MaintenanceStatus,
    pub resolution_note: Option<String>,
}

async fn caller_student(state: &AppState, claims: &Claims) -> ApiResult<student::Model> {
    student_service::find_by_user_id(state.db(), claims.uid)
        .await?
        .ok_or_else(|| ApiError::forbidden("Only students can do this"))
}

pub async fn list_requests(
    State(state): State<AppState>,
    claims: Claims,
    Query(mut filter): Query<MaintenanceFilter>,
) -> ApiResult<Json<Value>> {
    if !claims.is_admin() {
        filter.student_id = Some(caller_student(&state, &claims).await?.id);
    }

    let requests = maintenance_service::list_requests(state.db(), filter).await?;
    Ok(Json(json!({ "success": true, "requests": requests })))
}

pub async fn create_request(
    State(state): State<AppState>,
    claims: Claims,
    Json(payload): Json<CreateMaintenanceRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let student_id = if claims.is_admin() {
        payload.student_id
    } else {
        Some(caller_student(&state, &claims).await?.id)
    };

    let request = maintenance_service::create_request(
        state.db(),
        state.activity.as_ref(),
        Some(claims.uid),
        CreateMaintenanceInput {
            room_id: payload.room_id,
            student_id,
            title: payload.title,
            description: payload.description,
            priority: payload.priority,
        },
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "request": request })),
    ))
}

pub async fn update_status(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
    Json(payload): Json<MaintenanceStatusRequest>,
) -> ApiResult<Json<Value>> {
    let request = maintenance_service::update_status(
        state.db(),
        state.activity.as_ref(),
        Some(admin.uid),
        id,
        payload.status,
        payload.resolution_note,
    )
    .await?;
    Ok(Json(json!({ "success": true, "request": request })))
}

pub async fn cancel_request(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let student = caller_student(&state, &claims).await?;
    let request = maintenance_service::cancel_request(
        state.db(),
        state.activity.as_ref(),
        Some(claims.uid),
        id,
        student.id,
    )
    .await?;
    Ok(Json(json!({ "success": true, "request": request })))
}
