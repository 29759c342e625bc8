//! Caller identity supplied by the upstream gateway.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use course_core::model::UserId;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Authenticated learner extracted from the `x-user-id` / `x-user-name` headers.
///
/// A missing or blank id rejects the request with `401` before any handler runs.
#[derive(Debug, Clone)]
pub struct Learner {
    pub user_id: UserId,
    pub name: Option<String>,
}

impl<S> FromRequestParts<S> for Learner
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing x-user-id header".into()))?;
        let user_id = UserId::new(raw)
            .map_err(|_| ApiError::Unauthorized("Blank x-user-id header".into()))?;

        let name = parts
            .headers
            .get(USER_NAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        Ok(Learner { user_id, name })
    }
}
