pub mod health;

use axum::Router;
use axum::routing::{get, post};

use crate::handlers::{enrollments, progress};
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// POST /enrollments                                      -> enroll
/// GET  /enrollments                                      -> list_enrollments
/// GET  /progress/{course_id}                             -> get_progress
/// PUT  /progress/{course_id}                             -> update_progress
/// GET  /progress/{course_id}/overview                    -> overview
/// POST /progress/{course_id}/lessons/{lesson_id}/complete -> complete_lesson
/// POST /progress/{course_id}/advance                     -> advance
/// POST /progress/{course_id}/navigate                    -> navigate
/// POST /progress/{course_id}/quiz                        -> submit_quiz
/// GET  /progress/{course_id}/certificate                 -> certificate
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/enrollments",
            post(enrollments::enroll).get(enrollments::list_enrollments),
        )
        .route(
            "/progress/{course_id}",
            get(progress::get_progress).put(progress::update_progress),
        )
        .route("/progress/{course_id}/overview", get(progress::overview))
        .route(
            "/progress/{course_id}/lessons/{lesson_id}/complete",
            post(progress::complete_lesson),
        )
        .route("/progress/{course_id}/advance", post(progress::advance))
        .route("/progress/{course_id}/navigate", post(progress::navigate))
        .route("/progress/{course_id}/quiz", post(progress::submit_quiz))
        .route(
            "/progress/{course_id}/certificate",
            get(progress::certificate),
        )
}
