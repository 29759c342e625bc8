//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::{CatalogError, CourseId, ModuleId, RecordError};
use course_core::{AttemptError, ProgressError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `EnrollmentService` and `LearningService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnrollmentError {
    /// Caller input failed validation; `field` names the offending JSON field.
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("already enrolled in course {0}")]
    AlreadyEnrolled(CourseId),
    #[error("enrollment not found")]
    NotFound,
    #[error("module {0} is locked")]
    AccessDenied(ModuleId),
    #[error("progress was modified concurrently")]
    Conflict,
    #[error(transparent)]
    Progress(ProgressError),
    #[error(transparent)]
    Storage(StorageError),
}

impl EnrollmentError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<ProgressError> for EnrollmentError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::AccessDenied(module) => Self::AccessDenied(module),
            other => Self::Progress(other),
        }
    }
}

impl From<StorageError> for EnrollmentError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound,
            StorageError::Conflict => Self::Conflict,
            other => Self::Storage(other),
        }
    }
}

impl From<RecordError> for EnrollmentError {
    fn from(err: RecordError) -> Self {
        Self::Validation {
            field: err.field(),
            message: err.to_string(),
        }
    }
}

impl From<AttemptError> for EnrollmentError {
    fn from(err: AttemptError) -> Self {
        Self::Validation {
            field: "answers",
            message: err.to_string(),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_denied_is_lifted_out_of_engine_errors() {
        let module = ModuleId::new("m2").unwrap();
        let err = EnrollmentError::from(ProgressError::AccessDenied(module.clone()));
        assert!(matches!(err, EnrollmentError::AccessDenied(m) if m == module));

        let err = EnrollmentError::from(ProgressError::UnknownModule(module));
        assert!(matches!(err, EnrollmentError::Progress(_)));
    }

    #[test]
    fn storage_not_found_and_conflict_map_to_service_variants() {
        assert!(matches!(
            EnrollmentError::from(StorageError::NotFound),
            EnrollmentError::NotFound
        ));
        assert!(matches!(
            EnrollmentError::from(StorageError::Conflict),
            EnrollmentError::Conflict
        ));
        assert!(matches!(
            EnrollmentError::from(StorageError::Connection("down".into())),
            EnrollmentError::Storage(_)
        ));
    }

    #[test]
    fn record_errors_keep_their_field() {
        let err = EnrollmentError::from(RecordError::ScoreOutOfRange(120.0));
        assert!(matches!(err, EnrollmentError::Validation { field: "score", .. }));
    }
}
