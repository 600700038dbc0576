use axum::{Json, extract::State};
use serde_json::{Value, json};

use super::error::ApiResult;
use crate::auth::AdminClaims;
use crate::infrastructure::AppState;
use crate::scheduler;

/// Run one expiration cycle now instead of waiting for the next tick.
#[utoipa::path(
    post,
    path = "/api/admin/expire",
    responses(
        (status = 200, description = "Cycle report", body = crate::services::expiration::ExpirationReport),
        (status = 403, description = "Administrator role required")
    )
)]
pub async fn run_expiration(
    State(state): State<AppState>,
    AdminClaims(admin): AdminClaims,
) -> ApiResult<Json<Value>> {
    tracing::info!(admin = %admin.sub, "Manual expiration run requested");
    let report = scheduler::run_once(&state).await;
    Ok(Json(json!({ "success": report.errors.is_empty(), "report": report })))
}
