use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use super::error::ApiResult;
use crate::auth::{AdminClaims, Claims};
use crate::infrastructure::AppState;
use crate::services::building_service::{self, BuildingInput};

pub async fn list_buildings(
    State(state): State<AppState>,
    _claims: Claims,
) -> ApiResult<Json<Value>> {
    let buildings = building_service::list_buildings(state.db()).await?;
    Ok(Json(json!({ "success": true, "buildings": buildings })))
}

pub async fn get_building(
    State(state): State<AppState>,
    _claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let building = building_service::get_building(state.db(), id).await?;
    Ok(Json(json!({ "success": true, "building": building })))
}

pub async fn create_building(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Json(payload): Json<BuildingInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let building = building_service::create_building(
        state.db(),
        state.activity.as_ref(),
        Some(admin.uid),
        payload,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "building": building })),
    ))
}

pub async fn update_building(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
    Json(payload): Json<BuildingInput>,
) -> ApiResult<Json<Value>> {
    let building = building_service::update_building(
        state.db(),
        state.activity.as_ref(),
        Some(admin.uid),
        id,
        payload,
    )
    .await?;
    Ok(Json(json!({ "success": true, "building": building })))
}

pub async fn delete_building(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    building_service::delete_building(state.db(), state.activity.as_ref(), Some(admin.uid), id)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Building deleted" })))
}
