use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::error::{ApiError, ApiResult};
use crate::auth::{AdminClaims, Claims};
use crate::domain::StudentStatus;
use crate::infrastructure::AppState;
use crate::services::contract_service;
use crate::services::student_service::{self, StudentFilter, UpdateStudentProfileInput};

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: StudentStatus,
}

/// Admins see everyone; a student only their own profile.
async fn ensure_self_or_admin(state: &AppState, claims: &Claims, id: i32) -> ApiResult<()> {
    if claims.is_admin() {
        return Ok(());
    }
    match student_service::find_by_user_id(state.db(), claims.uid).await? {
        Some(own) if own.id == id => Ok(()),
        _ => Err(ApiError::forbidden("You can only access your own profile")),
    }
}

pub async fn list_students(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Query(filter): Query<StudentFilter>,
) -> ApiResult<Json<Value>> {
    let students = student_service::list_students(state.db(), filter).await?;
    Ok(Json(json!({ "success": true, "students": students, "total": students.len() })))
}

pub async fn get_student(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    ensure_self_or_admin(&state, &claims, id).await?;

    let student = student_service::get_student(state.db(), id).await?;
    let contract = contract_service::active_contract_for_student(state.db(), id).await?;
    Ok(Json(json!({
        "success": true,
        "student": student,
        "active_contract": contract,
    })))
}

pub async fn update_student(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateStudentProfileInput>,
) -> ApiResult<Json<Value>> {
    ensure_self_or_admin(&state, &claims, id).await?;

    let student = student_service::update_profile(
        state.db(),
        state.activity.as_ref(),
        Some(claims.uid),
        id,
        payload,
    )
    .await?;
    Ok(Json(json!({ "success": true, "student": student })))
}

pub async fn activate_student(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let student =
        student_service::activate_student(state.db(), state.activity.as_ref(), Some(admin.uid), id)
            .await?;
    Ok(Json(json!({ "success": true, "student": student })))
}

pub async fn reject_student(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let student =
        student_service::reject_student(state.db(), state.activity.as_ref(), Some(admin.uid), id)
            .await?;
    Ok(Json(json!({ "success": true, "student": student })))
}

pub async fn set_student_status(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
    Json(payload): Json<StatusRequest>,
) -> ApiResult<Json<Value>> {
    let student = student_service::set_student_status(
        state.db(),
        state.activity.as_ref(),
        Some(admin.uid),
        id,
        payload.status,
    )
    .await?;
    Ok(Json(json!({ "success": true, "student": student })))
}
