use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use super::error::{ApiError, ApiResult};
use crate::auth::{AdminClaims, Claims};
use crate::infrastructure::AppState;
use crate::services::contract_service::{
    self, ContractFilter, CreateContractInput, UpdateContractInput,
};
use crate::services::student_service;

/// Admins list any contracts; students only ever see their own.
pub async fn list_contracts(
    State(state): State<AppState>,
    claims: Claims,
    Query(mut filter): Query<ContractFilter>,
) -> ApiResult<Json<Value>> {
    if !claims.is_admin() {
        let Some(own) = student_service::find_by_user_id(state.db(), claims.uid).await? else {
            return Ok(Json(json!({ "success": true, "contracts": [] })));
        };
        filter.student_id = Some(own.id);
    }

    let contracts = contract_service::list_contracts(state.db(), filter).await?;
    Ok(Json(json!({ "success": true, "contracts": contracts })))
}

pub async fn get_contract(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let contract = contract_service::get_contract(state.db(), id).await?;

    if !claims.is_admin() {
        let own = student_service::find_by_user_id(state.db(), claims.uid).await?;
        if own.map(|s| s.id) != Some(contract.contract.student_id) {
            return Err(ApiError::forbidden("You can only access your own contracts"));
        }
    }

    Ok(Json(json!({ "success": true, "contract": contract })))
}

#[utoipa::path(
    post,
    path = "/api/contracts",
    request_body = CreateContractInput,
    responses(
        (status = 201, description = "Contract created", body = contract_service::CreatedContract),
        (status = 400, description = "Room under maintenance", body = super::error::ErrorBody),
        (status = 404, description = "Student or room not found", body = super::error::ErrorBody),
        (status = 409, description = "room_full, gender_mismatch or duplicate_active_contract", body = super::error::ErrorBody)
    )
)]
pub async fn create_contract(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Json(payload): Json<CreateContractInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let created = contract_service::create_contract(
        state.db(),
        state.activity.as_ref(),
        Some(admin.uid),
        payload,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Contract created",
            "contract_id": created.contract_id,
            "contract_number": created.contract_number,
        })),
    ))
}

pub async fn update_contract(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateContractInput>,
) -> ApiResult<Json<Value>> {
    let contract = contract_service::update_contract(
        state.db(),
        state.activity.as_ref(),
        Some(admin.uid),
        id,
        payload,
    )
    .await?;
    Ok(Json(json!({ "success": true, "contract": contract })))
}

pub async fn terminate_contract(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let contract =
        contract_service::terminate_contract(state.db(), state.activity.as_ref(), Some(admin.uid), id)
            .await?;
    Ok(Json(json!({ "success": true, "contract": contract })))
}

pub async fn delete_contract(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    contract_service::delete_contract(state.db(), state.activity.as_ref(), Some(admin.uid), id)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Contract deleted" })))
}
