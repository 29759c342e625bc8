use std::sync::Arc;

use course_core::model::Catalog;
use storage::repository::Storage;

use crate::Clock;
use crate::enrollment_service::EnrollmentService;
use crate::error::AppServicesError;
use crate::learning_service::LearningService;

/// Assembles the request-facing services over one storage backend and catalog.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<Catalog>,
    enrollments: Arc<EnrollmentService>,
    learning: Arc<LearningService>,
}

impl AppServices {
    #[must_use]
    pub fn new(clock: Clock, catalog: Arc<Catalog>, storage: &Storage) -> Self {
        let enrollments = Arc::new(EnrollmentService::new(
            clock,
            Arc::clone(&catalog),
            Arc::clone(&storage.enrollments),
        ));
        let learning = Arc::new(LearningService::new(
            clock,
            Arc::clone(&catalog),
            Arc::clone(&storage.enrollments),
        ));
        Self {
            catalog,
            enrollments,
            learning,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        catalog: Arc<Catalog>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        tracing::info!(courses = catalog.len(), "services ready");
        Ok(Self::new(clock, catalog, &storage))
    }

    /// Services over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock, catalog: Arc<Catalog>) -> Self {
        Self::new(clock, catalog, &Storage::in_memory())
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn enrollments(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollments)
    }

    #[must_use]
    pub fn learning(&self) -> Arc<LearningService> {
        Arc::clone(&self.learning)
    }
}
