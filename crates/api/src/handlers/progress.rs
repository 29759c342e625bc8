//! Handlers for progress reads, overwrites and learner transitions.
//!
//! All endpoints are scoped to the caller's enrollment in `{course_id}`.

use std::collections::HashMap;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use course_core::LessonCursor;
use course_core::model::{CourseId, LessonId, ModuleId, ProgressRecord, QuestionId};
use services::QuizSubmission;

use crate::error::ApiResult;
use crate::handlers::parse_id;
use crate::identity::Learner;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateProgressRequest {
    pub progress: ProgressRecord,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceRequest {
    pub module_id: ModuleId,
    pub lesson_index: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateRequest {
    pub module_id: ModuleId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
    pub module_id: ModuleId,
    #[serde(default)]
    pub answers: HashMap<QuestionId, String>,
    #[serde(default)]
    pub lesson_index: Option<usize>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

/// GET /api/progress/{course_id}
pub async fn get_progress(
    learner: Learner,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let course_id: CourseId = parse_id(course_id, "courseId")?;
    let progress = state
        .services
        .enrollments()
        .get_progress(&learner.user_id, &course_id)
        .await?;

    Ok(Json(json!({ "progress": progress })))
}

/// PUT /api/progress/{course_id}
///
/// Overwrites the stored record; the last writer wins.
pub async fn update_progress(
    learner: Learner,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    payload: Result<Json<UpdateProgressRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let course_id: CourseId = parse_id(course_id, "courseId")?;
    let Json(body) = payload?;
    state
        .services
        .enrollments()
        .apply_progress(&learner.user_id, &course_id, body.progress)
        .await?;

    Ok(Json(json!({ "message": "Progress updated" })))
}

/// GET /api/progress/{course_id}/overview
pub async fn overview(
    learner: Learner,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let course_id: CourseId = parse_id(course_id, "courseId")?;
    let overview = state
        .services
        .enrollments()
        .overview(&learner.user_id, &course_id)
        .await?;

    Ok(Json(overview))
}

/// POST /api/progress/{course_id}/lessons/{lesson_id}/complete
pub async fn complete_lesson(
    learner: Learner,
    State(state): State<AppState>,
    Path((course_id, lesson_id)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let course_id: CourseId = parse_id(course_id, "courseId")?;
    let lesson_id: LessonId = parse_id(lesson_id, "lessonId")?;
    let progress = state
        .services
        .learning()
        .complete_lesson(&learner.user_id, &course_id, &lesson_id)
        .await?;

    Ok(Json(json!({ "progress": progress })))
}

/// POST /api/progress/{course_id}/advance
pub async fn advance(
    learner: Learner,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    payload: Result<Json<AdvanceRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let course_id: CourseId = parse_id(course_id, "courseId")?;
    let Json(body) = payload?;
    let cursor = LessonCursor::new(body.module_id, body.lesson_index);
    let step = state
        .services
        .learning()
        .advance(&learner.user_id, &course_id, &cursor)
        .await?;

    Ok(Json(step))
}

/// POST /api/progress/{course_id}/navigate
pub async fn navigate(
    learner: Learner,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    payload: Result<Json<NavigateRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let course_id: CourseId = parse_id(course_id, "courseId")?;
    let Json(body) = payload?;
    let navigation = state
        .services
        .learning()
        .navigate(&learner.user_id, &course_id, &body.module_id)
        .await?;

    Ok(Json(navigation))
}

/// POST /api/progress/{course_id}/quiz
///
/// Grades the attempt; only a pass changes progress.
pub async fn submit_quiz(
    learner: Learner,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    payload: Result<Json<QuizRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let course_id: CourseId = parse_id(course_id, "courseId")?;
    let Json(body) = payload?;
    let submission = QuizSubmission {
        module_id: body.module_id,
        answers: body.answers,
        lesson_index: body.lesson_index,
        started_at: body.started_at,
    };
    let result = state
        .services
        .learning()
        .submit_quiz(&learner.user_id, &course_id, submission)
        .await?;

    Ok(Json(result))
}

/// GET /api/progress/{course_id}/certificate
pub async fn certificate(
    learner: Learner,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let course_id: CourseId = parse_id(course_id, "courseId")?;
    let certificate = state
        .services
        .learning()
        .course_completion(&learner.user_id, &course_id)
        .await?;

    Ok(Json(certificate))
}
