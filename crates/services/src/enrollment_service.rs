use std::sync::Arc;

use course_core::engine::ProgressOverview;
use course_core::model::{
    Catalog, Course, CourseId, Enrollment, EnrollmentId, ProgressRecord, UserId,
};
use course_core::ProgressEngine;
use storage::repository::{EnrollmentRepository, StorageError};

use crate::error::EnrollmentError;
use crate::Clock;

/// Enrollment lifecycle and direct progress reads/writes.
#[derive(Clone)]
pub struct EnrollmentService {
    clock: Clock,
    catalog: Arc<Catalog>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<Catalog>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            enrollments,
        }
    }

    /// Enroll a user in a course, starting from the initial progress record.
    ///
    /// A missing or blank `course_name` falls back to the catalog title.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::Validation` if `course_id` is blank or not in
    /// the catalog, `EnrollmentError::AlreadyEnrolled` if the user is already
    /// enrolled, and `EnrollmentError::Storage` if persistence fails.
    pub async fn enroll(
        &self,
        user_id: &UserId,
        user_name: Option<String>,
        course_id: &str,
        course_name: Option<String>,
    ) -> Result<EnrollmentId, EnrollmentError> {
        let course_id = CourseId::new(course_id)
            .map_err(|_| EnrollmentError::validation("courseId", "course id is required"))?;
        let course = self.catalog.course(&course_id).ok_or_else(|| {
            EnrollmentError::validation("courseId", format!("unknown course {course_id}"))
        })?;

        if self
            .enrollments
            .find_enrollment(user_id, &course_id)
            .await?
            .is_some()
        {
            return Err(EnrollmentError::AlreadyEnrolled(course_id));
        }

        let now = self.clock.now();
        let course_name = course_name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| course.title().to_owned());
        let enrollment = Enrollment::new(
            user_id.clone(),
            user_name.filter(|name| !name.trim().is_empty()),
            course_id.clone(),
            course_name,
            ProgressRecord::initial(course, now),
            now,
        );

        // The unique key still guards a racing enroll that passed the lookup.
        match self.enrollments.insert_enrollment(&enrollment).await {
            Ok(()) => {}
            Err(StorageError::Conflict) => return Err(EnrollmentError::AlreadyEnrolled(course_id)),
            Err(err) => return Err(err.into()),
        }

        tracing::info!(
            user_id = %user_id,
            course_id = %course_id,
            enrollment_id = %enrollment.id,
            "enrolled"
        );
        Ok(enrollment.id)
    }

    /// All enrollments of the user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::Storage` if repository access fails.
    pub async fn list_enrollments(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Enrollment>, EnrollmentError> {
        Ok(self.enrollments.list_enrollments(user_id).await?)
    }

    /// The stored progress record for one course.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::NotFound` if the user is not enrolled.
    pub async fn get_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<ProgressRecord, EnrollmentError> {
        let enrollment = load_enrollment(self.enrollments.as_ref(), user_id, course_id).await?;
        Ok(enrollment.progress)
    }

    /// Overwrite the progress record (last writer wins).
    ///
    /// The record must fit the course structure; it is not compared against
    /// the stored record.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::NotFound` if the user is not enrolled, and
    /// `EnrollmentError::Validation` if the record does not fit the course.
    pub async fn apply_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        record: ProgressRecord,
    ) -> Result<(), EnrollmentError> {
        load_enrollment(self.enrollments.as_ref(), user_id, course_id).await?;
        let course = course_for(&self.catalog, course_id)?;
        record.validate_against(course)?;

        let revision = self
            .enrollments
            .update_progress(user_id, course_id, &record, self.clock.now())
            .await?;
        tracing::debug!(
            user_id = %user_id,
            course_id = %course_id,
            revision,
            "progress overwritten"
        );
        Ok(())
    }

    /// Per-module accessibility and completion for the enrolled course.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::NotFound` if the user is not enrolled or the
    /// course has left the catalog.
    pub async fn overview(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<ProgressOverview, EnrollmentError> {
        let enrollment = load_enrollment(self.enrollments.as_ref(), user_id, course_id).await?;
        let course = course_for(&self.catalog, course_id)?;
        Ok(ProgressEngine::new(course).overview(&enrollment.progress))
    }
}

pub(crate) fn course_for<'a>(
    catalog: &'a Catalog,
    course_id: &CourseId,
) -> Result<&'a Course, EnrollmentError> {
    catalog.course(course_id).ok_or_else(|| {
        tracing::warn!(course_id = %course_id, "enrollment references a course missing from the catalog");
        EnrollmentError::NotFound
    })
}

pub(crate) async fn load_enrollment(
    enrollments: &dyn EnrollmentRepository,
    user_id: &UserId,
    course_id: &CourseId,
) -> Result<Enrollment, EnrollmentError> {
    enrollments
        .find_enrollment(user_id, course_id)
        .await?
        .ok_or(EnrollmentError::NotFound)
}
