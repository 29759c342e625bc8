use chrono::{DateTime, Utc};
use course_core::model::{CourseId, Enrollment, ProgressRecord, UserId};

use super::SqliteRepository;
use super::mapping::{lessons_to_json, map_enrollment_row, revision_from_i64, revision_to_i64};
use crate::repository::{EnrollmentRepository, StorageError};

const SELECT_COLUMNS: &str = r"
    SELECT
        id, user_id, user_name, course_id, course_name, status, enrolled_at, updated_at,
        revision, completed_modules, current_module, completed_lessons, score, last_activity
    FROM enrollments
";

fn connection(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl SqliteRepository {
    async fn exists(&self, user_id: &UserId, course_id: &CourseId) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM enrollments WHERE user_id = ?1 AND course_id = ?2")
            .bind(user_id.as_str())
            .bind(course_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(connection)?;
        Ok(row.is_some())
    }

    async fn write_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        progress: &ProgressRecord,
        expected_revision: Option<u64>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<u64>, StorageError> {
        let expected = expected_revision.map(revision_to_i64).transpose()?;

        let revision: Option<i64> = sqlx::query_scalar(
            r"
            UPDATE enrollments SET
                completed_modules = ?3,
                current_module = ?4,
                completed_lessons = ?5,
                score = ?6,
                last_activity = ?7,
                updated_at = ?8,
                revision = revision + 1
            WHERE user_id = ?1 AND course_id = ?2
              AND (?9 IS NULL OR revision = ?9)
            RETURNING revision
            ",
        )
        .bind(user_id.as_str())
        .bind(course_id.as_str())
        .bind(i64::from(progress.completed_modules))
        .bind(progress.current_module.as_str())
        .bind(lessons_to_json(&progress.completed_lessons)?)
        .bind(progress.score)
        .bind(progress.last_activity)
        .bind(updated_at)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await
        .map_err(connection)?;

        revision.map(revision_from_i64).transpose()
    }
}

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn find_enrollment(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = ?1 AND course_id = ?2");
        let row = sqlx::query(&sql)
            .bind(user_id.as_str())
            .bind(course_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(connection)?;

        row.as_ref().map(map_enrollment_row).transpose()
    }

    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let progress = &enrollment.progress;
        let result = sqlx::query(
            r"
            INSERT INTO enrollments (
                id, user_id, user_name, course_id, course_name, status, enrolled_at, updated_at,
                revision, completed_modules, current_module, completed_lessons, score, last_activity
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ",
        )
        .bind(enrollment.id.to_string())
        .bind(enrollment.user_id.as_str())
        .bind(enrollment.user_name.as_deref())
        .bind(enrollment.course_id.as_str())
        .bind(enrollment.course_name.as_str())
        .bind(enrollment.status.as_str())
        .bind(enrollment.enrolled_at)
        .bind(enrollment.updated_at)
        .bind(revision_to_i64(enrollment.revision)?)
        .bind(i64::from(progress.completed_modules))
        .bind(progress.current_module.as_str())
        .bind(lessons_to_json(&progress.completed_lessons)?)
        .bind(progress.score)
        .bind(progress.last_activity)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                tracing::debug!(
                    user_id = %enrollment.user_id,
                    course_id = %enrollment.course_id,
                    "enrollment insert hit unique key"
                );
                Err(StorageError::Conflict)
            }
            Err(e) => Err(connection(e)),
        }
    }

    async fn list_enrollments(&self, user_id: &UserId) -> Result<Vec<Enrollment>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY enrolled_at ASC, course_id ASC");
        let rows = sqlx::query(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(connection)?;

        let mut enrollments = Vec::with_capacity(rows.len());
        for row in &rows {
            enrollments.push(map_enrollment_row(row)?);
        }
        Ok(enrollments)
    }

    async fn update_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        progress: &ProgressRecord,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        self.write_progress(user_id, course_id, progress, None, updated_at)
            .await?
            .ok_or(StorageError::NotFound)
    }

    async fn update_progress_if_revision(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        progress: &ProgressRecord,
        expected_revision: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        match self
            .write_progress(user_id, course_id, progress, Some(expected_revision), updated_at)
            .await?
        {
            Some(revision) => Ok(revision),
            None if self.exists(user_id, course_id).await? => Err(StorageError::Conflict),
            None => Err(StorageError::NotFound),
        }
    }
}
