//! Error-kind to HTTP-status mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use ferry_coordinator::Error as CoordinatorError;
use serde_json::json;
use tracing::error;

/// Error wrapper that renders coordinator error kinds as distinct HTTP
/// responses with a machine-readable `error` tag.
#[derive(Debug)]
pub struct ApiError(pub CoordinatorError);

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        ApiError(err)
    }
}

impl From<ferry_storage::Error> for ApiError {
    fn from(err: ferry_storage::Error) -> Self {
        ApiError(CoordinatorError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            CoordinatorError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            CoordinatorError::AlreadyExists(_) => (StatusCode::CONFLICT, "already_exists"),
            CoordinatorError::LeaseNotOwned(_) => (StatusCode::CONFLICT, "lease_not_owned"),
            CoordinatorError::LeaseExpired(_) => (StatusCode::GONE, "lease_expired"),
            CoordinatorError::Validation(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error")
            }
            // "Not ready yet" rather than a failure; callers poll again later.
            CoordinatorError::StatusUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "status_not_yet_available")
            }
            CoordinatorError::Search(_) | CoordinatorError::Storage(_) => {
                error!(error = %self.0, "internal error serving request");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let body = Json(json!({
            "error": kind,
            "detail": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
