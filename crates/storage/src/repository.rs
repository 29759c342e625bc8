use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{CourseId, Enrollment, ProgressRecord, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persistence contract for enrollments and their embedded progress records.
///
/// Records are keyed by (user, course); at most one enrollment exists per key.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Point lookup by (user, course).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup fails; a missing row is `Ok(None)`.
    async fn find_enrollment(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, StorageError>;

    /// Insert a new enrollment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the (user, course) key already exists.
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError>;

    /// All enrollments of a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    async fn list_enrollments(&self, user_id: &UserId) -> Result<Vec<Enrollment>, StorageError>;

    /// Overwrite the progress record unconditionally (last writer wins).
    ///
    /// Returns the new revision.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no enrollment exists for the key.
    async fn update_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        progress: &ProgressRecord,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StorageError>;

    /// Overwrite the progress record only if the stored revision still matches.
    ///
    /// Returns the new revision.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if another write landed first, or
    /// `StorageError::NotFound` if no enrollment exists for the key.
    async fn update_progress_if_revision(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        progress: &ProgressRecord,
        expected_revision: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StorageError>;
}

type EnrollmentKey = (UserId, CourseId);

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    enrollments: Arc<Mutex<HashMap<EnrollmentKey, Enrollment>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            enrollments: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn write(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        progress: &ProgressRecord,
        expected_revision: Option<u64>,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let mut guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let enrollment = guard
            .get_mut(&(user_id.clone(), course_id.clone()))
            .ok_or(StorageError::NotFound)?;
        if expected_revision.is_some_and(|r| r != enrollment.revision) {
            return Err(StorageError::Conflict);
        }
        enrollment.progress = progress.clone();
        enrollment.updated_at = updated_at;
        enrollment.revision += 1;
        Ok(enrollment.revision)
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn find_enrollment(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(user_id.clone(), course_id.clone())).cloned())
    }

    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let mut guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let key = (enrollment.user_id.clone(), enrollment.course_id.clone());
        if guard.contains_key(&key) {
            return Err(StorageError::Conflict);
        }
        guard.insert(key, enrollment.clone());
        Ok(())
    }

    async fn list_enrollments(&self, user_id: &UserId) -> Result<Vec<Enrollment>, StorageError> {
        let guard = self
            .enrollments
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<Enrollment> = guard
            .values()
            .filter(|e| &e.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.enrolled_at
                .cmp(&b.enrolled_at)
                .then_with(|| a.course_id.cmp(&b.course_id))
        });
        Ok(found)
    }

    async fn update_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        progress: &ProgressRecord,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        self.write(user_id, course_id, progress, None, updated_at)
    }

    async fn update_progress_if_revision(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        progress: &ProgressRecord,
        expected_revision: u64,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        self.write(
            user_id,
            course_id,
            progress,
            Some(expected_revision),
            updated_at,
        )
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub enrollments: Arc<dyn EnrollmentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(InMemoryRepository::new());
        Self { enrollments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{Course, Lesson, LessonId, LessonKind, Module, ModuleId};
    use course_core::time::fixed_now;

    fn course() -> Course {
        Course::new(
            CourseId::new("course").unwrap(),
            "Course",
            vec![Module::new(
                ModuleId::new("m1").unwrap(),
                "M1",
                vec![Lesson::new(
                    LessonId::new("l1").unwrap(),
                    "L1",
                    LessonKind::Reading { body: "b".into() },
                )],
                false,
            )],
            vec![],
        )
        .unwrap()
    }

    fn enrollment(user: &str) -> Enrollment {
        let course = course();
        Enrollment::new(
            UserId::new(user).unwrap(),
            None,
            course.id().clone(),
            course.title(),
            ProgressRecord::initial(&course, fixed_now()),
            fixed_now(),
        )
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_key() {
        let repo = InMemoryRepository::new();
        repo.insert_enrollment(&enrollment("u1")).await.unwrap();

        let err = repo.insert_enrollment(&enrollment("u1")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));

        let listed = repo
            .list_enrollments(&UserId::new("u1").unwrap())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn update_bumps_revision_and_overwrites() {
        let repo = InMemoryRepository::new();
        let e = enrollment("u1");
        repo.insert_enrollment(&e).await.unwrap();

        let mut progress = e.progress.clone();
        progress.completed_lessons.insert(LessonId::new("l1").unwrap());
        let revision = repo
            .update_progress(&e.user_id, &e.course_id, &progress, fixed_now())
            .await
            .unwrap();
        assert_eq!(revision, 1);

        let stored = repo
            .find_enrollment(&e.user_id, &e.course_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.progress, progress);
        assert_eq!(stored.revision, 1);
    }

    #[tokio::test]
    async fn stale_revision_is_a_conflict() {
        let repo = InMemoryRepository::new();
        let e = enrollment("u1");
        repo.insert_enrollment(&e).await.unwrap();

        repo.update_progress_if_revision(&e.user_id, &e.course_id, &e.progress, 0, fixed_now())
            .await
            .unwrap();
        let err = repo
            .update_progress_if_revision(&e.user_id, &e.course_id, &e.progress, 0, fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn update_of_missing_enrollment_is_not_found() {
        let repo = InMemoryRepository::new();
        let e = enrollment("u1");
        let err = repo
            .update_progress(&e.user_id, &e.course_id, &e.progress, fixed_now())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
