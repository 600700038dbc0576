use axum::Json;
use serde_json::{Value, json};

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy")
    )
)]
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "success": true,
        "status": "ok",
        "service": "dormkeeper",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
