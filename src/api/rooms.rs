use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

use super::error::ApiResult;
use crate::auth::{AdminClaims, Claims};
use crate::domain::RoomStatus;
use crate::infrastructure::AppState;
use crate::services::occupancy;
use crate::services::room_service::{self, CreateRoomInput, RoomFilter, UpdateRoomInput};

#[derive(Deserialize, ToSchema)]
pub struct RoomStatusRequest {
    /// `available` or `maintenance`
    #[schema(value_type = String)]
    pub status: RoomStatus,
}

pub async fn list_rooms(
    State(state): State<AppState>,
    _claims: Claims,
    Query(filter): Query<RoomFilter>,
) -> ApiResult<Json<Value>> {
    let rooms = room_service::list_rooms(state.db(), filter).await?;
    Ok(Json(json!({ "success": true, "rooms": rooms })))
}

pub async fn get_room(
    State(state): State<AppState>,
    _claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let room = room_service::get_room(state.db(), id).await?;
    Ok(Json(json!({ "success": true, "room": room })))
}

pub async fn create_room(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Json(payload): Json<CreateRoomInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let room =
        room_service::create_room(state.db(), state.activity.as_ref(), Some(admin.uid), payload)
            .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "room": room })),
    ))
}

pub async fn update_room(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateRoomInput>,
) -> ApiResult<Json<Value>> {
    let room = room_service::update_room(
        state.db(),
        state.activity.as_ref(),
        Some(admin.uid),
        id,
        payload,
    )
    .await?;
    Ok(Json(json!({ "success": true, "room": room })))
}

pub async fn delete_room(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    room_service::delete_room(state.db(), state.activity.as_ref(), Some(admin.uid), id).await?;
    Ok(Json(json!({ "success": true, "message": "Room deleted" })))
}

#[utoipa::path(
    put,
    path = "/api/rooms/{id}/status",
    params(("id" = i32, Path, description = "Room id")),
    request_body = RoomStatusRequest,
    responses(
        (status = 200, description = "Room status updated"),
        (status = 409, description = "Room still has active contracts", body = super::error::ErrorBody),
        (status = 422, description = "`full` cannot be requested", body = super::error::ErrorBody)
    )
)]
pub async fn set_room_status(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
    Json(payload): Json<RoomStatusRequest>,
) -> ApiResult<Json<Value>> {
    let room = room_service::set_room_status(
        state.db(),
        state.activity.as_ref(),
        Some(admin.uid),
        id,
        payload.status,
    )
    .await?;
    Ok(Json(json!({ "success": true, "room": room })))
}

pub async fn list_residents(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let residents = room_service::list_residents(state.db(), id).await?;
    Ok(Json(json!({ "success": true, "residents": residents })))
}

pub async fn remove_resident(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path((room_id, student_id)): Path<(i32, i32)>,
) -> ApiResult<Json<Value>> {
    let contract = room_service::remove_resident(
        state.db(),
        state.activity.as_ref(),
        Some(admin.uid),
        room_id,
        student_id,
    )
    .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Resident removed",
        "contract": contract,
    })))
}

/// Rebuild the cached occupancy of one room from its contracts.
pub async fn recompute_room(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let room = occupancy::recompute_occupancy(state.db(), id).await?;
    Ok(Json(json!({ "success": true, "room": room })))
}
