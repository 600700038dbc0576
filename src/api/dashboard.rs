use axum::{Json, extract::State};
use serde_json::{Value, json};

use super::error::ApiResult;
use crate::auth::AdminClaims;
use crate::infrastructure::AppState;
use crate::services::dashboard;

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Occupancy, billing and workload figures", body = dashboard::DashboardSummary),
        (status = 403, description = "Administrator role required")
    )
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
    _admin: AdminClaims,
) -> ApiResult<Json<Value>> {
    let summary = dashboard::summary(state.db()).await?;
    Ok(Json(json!({ "success": true, "dashboard": summary })))
}
