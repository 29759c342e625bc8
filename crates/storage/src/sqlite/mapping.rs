use std::collections::BTreeSet;
use std::str::FromStr;

use course_core::model::{
    CourseId, Enrollment, EnrollmentId, EnrollmentStatus, LessonId, ModuleId, ProgressRecord,
    UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn revision_to_i64(revision: u64) -> Result<i64, StorageError> {
    i64::try_from(revision).map_err(|_| StorageError::Serialization("revision overflow".into()))
}

pub(crate) fn revision_from_i64(v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization("revision sign overflow".into()))
}

/// Completed lessons are stored as a JSON array of ids, sorted.
pub(crate) fn lessons_to_json(lessons: &BTreeSet<LessonId>) -> Result<String, StorageError> {
    serde_json::to_string(lessons).map_err(ser)
}

pub(crate) fn lessons_from_json(raw: &str) -> Result<BTreeSet<LessonId>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_enrollment_row(row: &SqliteRow) -> Result<Enrollment, StorageError> {
    let completed_modules_i64: i64 = row.try_get("completed_modules").map_err(ser)?;
    let completed_modules = u32::try_from(completed_modules_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid completed_modules: {completed_modules_i64}"))
    })?;

    let lessons_raw: String = row.try_get("completed_lessons").map_err(ser)?;
    let status_raw: String = row.try_get("status").map_err(ser)?;
    let id_raw: String = row.try_get("id").map_err(ser)?;

    let progress = ProgressRecord {
        completed_modules,
        current_module: ModuleId::new(row.try_get::<String, _>("current_module").map_err(ser)?)
            .map_err(ser)?,
        completed_lessons: lessons_from_json(&lessons_raw)?,
        score: row.try_get("score").map_err(ser)?,
        last_activity: row.try_get("last_activity").map_err(ser)?,
    };

    Ok(Enrollment {
        id: EnrollmentId::from_str(&id_raw).map_err(ser)?,
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?).map_err(ser)?,
        user_name: row.try_get("user_name").map_err(ser)?,
        course_id: CourseId::new(row.try_get::<String, _>("course_id").map_err(ser)?)
            .map_err(ser)?,
        course_name: row.try_get("course_name").map_err(ser)?,
        status: EnrollmentStatus::parse(&status_raw).map_err(ser)?,
        enrolled_at: row.try_get("enrolled_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
        revision: revision_from_i64(row.try_get("revision").map_err(ser)?)?,
        progress,
    })
}
