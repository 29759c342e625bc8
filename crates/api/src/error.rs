use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use course_core::ProgressError;
use services::EnrollmentError;

/// Error type for HTTP handlers.
///
/// Wraps service errors and adds HTTP-specific variants. Every variant
/// renders as `{ "error": message, "code": CODE }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or blank identity headers.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Missing or malformed request field (body, path segment) rejected
    /// before reaching a service. The message names the offending field.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Service(#[from] EnrollmentError),
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            ApiError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            ApiError::Service(err) => classify_service_error(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let body = json!({
            "error": message,
            "code": code,
        });
        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_service_error(err: &EnrollmentError) -> (StatusCode, &'static str, String) {
    match err {
        EnrollmentError::Validation { .. } => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
        }
        EnrollmentError::AlreadyEnrolled(_) => {
            (StatusCode::CONFLICT, "ALREADY_ENROLLED", err.to_string())
        }
        EnrollmentError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
        EnrollmentError::AccessDenied(_) => {
            (StatusCode::FORBIDDEN, "ACCESS_DENIED", err.to_string())
        }
        EnrollmentError::Conflict => (StatusCode::CONFLICT, "CONFLICT", err.to_string()),
        EnrollmentError::Progress(progress) => classify_progress_error(progress),
        EnrollmentError::Storage(storage) => {
            tracing::error!(error = %storage, "Storage error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Unhandled service error");
            internal()
        }
    }
}

fn classify_progress_error(err: &ProgressError) -> (StatusCode, &'static str, String) {
    match err {
        ProgressError::UnknownModule(_) | ProgressError::UnknownLesson(_) => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
        }
        ProgressError::AccessDenied(_) => (StatusCode::FORBIDDEN, "ACCESS_DENIED", err.to_string()),
        _ => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_TRANSITION",
            err.to_string(),
        ),
    }
}
