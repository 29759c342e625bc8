use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, EnrollmentId, UserId};
use crate::model::progress::ProgressRecord;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("invalid enrollment status: {0}")]
    InvalidStatus(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle status of an enrollment. Course completion is derived from the
/// progress record, never stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum EnrollmentStatus {
    Active,
}

impl EnrollmentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
        }
    }

    /// Parses the storage representation.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidStatus` for unknown values.
    pub fn parse(value: &str) -> Result<Self, EnrollmentError> {
        match value {
            "active" => Ok(EnrollmentStatus::Active),
            other => Err(EnrollmentError::InvalidStatus(other.to_owned())),
        }
    }
}

//
// ─── ENROLLMENT ────────────────────────────────────────────────────────────────
//

/// A learner's enrollment in one course, with its embedded progress record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub course_id: CourseId,
    pub course_name: String,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Write counter, bumped on every progress update.
    pub revision: u64,
    pub progress: ProgressRecord,
}

impl Enrollment {
    /// A new active enrollment at revision 0.
    #[must_use]
    pub fn new(
        user_id: UserId,
        user_name: Option<String>,
        course_id: CourseId,
        course_name: impl Into<String>,
        progress: ProgressRecord,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EnrollmentId::generate(),
            user_id,
            user_name,
            course_id,
            course_name: course_name.into(),
            status: EnrollmentStatus::Active,
            enrolled_at: now,
            updated_at: now,
            revision: 0,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_storage_text() {
        let status = EnrollmentStatus::parse("active").unwrap();
        assert_eq!(status.as_str(), "active");
        assert!(matches!(
            EnrollmentStatus::parse("paused"),
            Err(EnrollmentError::InvalidStatus(s)) if s == "paused"
        ));
    }
}
