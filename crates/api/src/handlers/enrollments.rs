//! Handlers for enrollment creation and listing.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use serde_json::json;

use course_core::model::EnrollmentId;

use crate::error::ApiResult;
use crate::identity::Learner;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    #[serde(default)]
    pub course_id: String,
    #[serde(default)]
    pub course_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollResponse {
    pub enrollment_id: EnrollmentId,
}

/// POST /api/enrollments
pub async fn enroll(
    learner: Learner,
    State(state): State<AppState>,
    payload: Result<Json<EnrollRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = payload?;
    let enrollment_id = state
        .services
        .enrollments()
        .enroll(
            &learner.user_id,
            learner.name,
            &body.course_id,
            body.course_name,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(EnrollResponse { enrollment_id })))
}

/// GET /api/enrollments
///
/// The caller's enrollments, oldest first, each with its progress record.
pub async fn list_enrollments(
    learner: Learner,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let enrollments = state
        .services
        .enrollments()
        .list_enrollments(&learner.user_id)
        .await?;

    Ok(Json(json!({ "enrollments": enrollments })))
}
