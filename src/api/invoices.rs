use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::error::{ApiError, ApiResult};
use crate::auth::{AdminClaims, Claims};
use crate::domain::InvoiceStatus;
use crate::infrastructure::AppState;
use crate::services::contract_service;
use crate::services::invoice_service::{self, CreateInvoiceInput, InvoiceFilter};
use crate::services::student_service;

#[derive(Deserialize)]
pub struct InvoiceStatusRequest {
    pub status: InvoiceStatus,
}

/// Room id of the caller's active contract, for student-scoped reads.
async fn own_room(state: &AppState, claims: &Claims) -> ApiResult<Option<i32>> {
    let Some(student) = student_service::find_by_user_id(state.db(), claims.uid).await? else {
        return Ok(None);
    };
    Ok(contract_service::active_contract_for_student(state.db(), student.id)
        .await?
        .map(|c| c.room_id))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    claims: Claims,
    Query(mut filter): Query<InvoiceFilter>,
) -> ApiResult<Json<Value>> {
    if !claims.is_admin() {
        match own_room(&state, &claims).await? {
            Some(room_id) => filter.room_id = Some(room_id),
            None => return Ok(Json(json!({ "success": true, "invoices": [] }))),
        }
    }

    let invoices = invoice_service::list_invoices(state.db(), filter).await?;
    Ok(Json(json!({ "success": true, "invoices": invoices })))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    let invoice = invoice_service::get_invoice(state.db(), id).await?;

    if !claims.is_admin() && own_room(&state, &claims).await? != Some(invoice.invoice.room_id) {
        return Err(ApiError::forbidden("You can only access invoices of your own room"));
    }

    Ok(Json(json!({ "success": true, "invoice": invoice })))
}

#[utoipa::path(
    post,
    path = "/api/invoices",
    request_body = CreateInvoiceInput,
    responses(
        (status = 201, description = "Invoice created"),
        (status = 404, description = "Room not found", body = super::error::ErrorBody),
        (status = 409, description = "duplicate_invoice", body = super::error::ErrorBody),
        (status = 422, description = "Malformed month or negative amounts", body = super::error::ErrorBody)
    )
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Json(payload): Json<CreateInvoiceInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let invoice = invoice_service::create_invoice(
        state.db(),
        state.activity.as_ref(),
        Some(admin.uid),
        &state.config.billing_rates,
        payload,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "invoice": invoice })),
    ))
}

pub async fn update_invoice_status(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
    Json(payload): Json<InvoiceStatusRequest>,
) -> ApiResult<Json<Value>> {
    let invoice = invoice_service::update_invoice_status(
        state.db(),
        state.activity.as_ref(),
        Some(admin.uid),
        id,
        payload.status,
    )
    .await?;
    Ok(Json(json!({ "success": true, "invoice": invoice })))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    invoice_service::delete_invoice(state.db(), state.activity.as_ref(), Some(admin.uid), id)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Invoice deleted" })))
}
