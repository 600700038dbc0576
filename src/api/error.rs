//! HTTP mapping of domain errors
//!
//! Every failure leaves the API as `{"success": false, "code", "message"}`.
//! Database and internal details are logged, never returned.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::DomainError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    /// Machine-readable code, e.g. `room_full` or `not_found`
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError(pub DomainError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            DomainError::Conflict(kind) => (StatusCode::CONFLICT, kind.as_str()),
            DomainError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            DomainError::InvalidState { .. } => (StatusCode::BAD_REQUEST, "invalid_state"),
            DomainError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            DomainError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            DomainError::Database(_) | DomainError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }

    pub fn forbidden(message: &str) -> Self {
        ApiError(DomainError::Forbidden(message.to_owned()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self.0 {
            DomainError::Database(_) | DomainError::Internal(_) => {
                tracing::error!(error = %self.0, "internal server error");
                "An internal error occurred".to_string()
            }
            DomainError::Conflict(kind) => kind.message().to_string(),
            DomainError::NotFound(entity) => format!("{} not found", entity),
            DomainError::InvalidState { message, .. } => message.clone(),
            DomainError::Validation(message)
            | DomainError::Unauthorized(message)
            | DomainError::Forbidden(message) => message.clone(),
        };

        let body = ErrorBody {
            success: false,
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConflictKind;

    #[test]
    fn conflicts_map_to_409_with_kind_code() {
        let err = ApiError(DomainError::Conflict(ConflictKind::RoomFull));
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "room_full");
    }

    #[test]
    fn not_found_and_validation_codes() {
        let (status, code) = ApiError(DomainError::NotFound("room")).status_and_code();
        assert_eq!((status, code), (StatusCode::NOT_FOUND, "not_found"));

        let (status, _) = ApiError(DomainError::validation("bad")).status_and_code();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = ApiError(DomainError::invalid_state("room", "maintenance"))
            .status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn internal_details_are_not_leaked() {
        let response =
            ApiError(DomainError::Database("no such table: rooms".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "internal_error");
        assert!(!body["message"].as_str().unwrap().contains("rooms"));
    }
}
