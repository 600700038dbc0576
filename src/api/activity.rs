use axum::{
    Json,
    extract::{Query, State},
};
use serde_json::{Value, json};

use super::error::ApiResult;
use crate::auth::AdminClaims;
use crate::infrastructure::AppState;
use crate::services::activity_service::{self, ActivityFilter};

pub async fn list_activity_logs(
    State(state): State<AppState>,
    _admin: AdminClaims,
    Query(filter): Query<ActivityFilter>,
) -> ApiResult<Json<Value>> {
    let logs = activity_service::list_activity_logs(state.db(), filter).await?;
    Ok(Json(json!({ "success": true, "logs": logs })))
}
