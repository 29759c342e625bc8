use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::course::Course;
use crate::model::ids::{LessonId, ModuleId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// A progress record that does not fit the course it belongs to.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum RecordError {
    #[error("completed modules {completed} exceeds module count {modules}")]
    CompletedModulesOutOfRange { completed: u32, modules: usize },

    #[error("current module {0} is not part of the course")]
    UnknownCurrentModule(ModuleId),

    #[error("lesson {0} is not part of the course")]
    UnknownLesson(LessonId),

    #[error("score {0} must be between 0 and 100")]
    ScoreOutOfRange(f64),
}

impl RecordError {
    /// Wire name of the offending field.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            RecordError::CompletedModulesOutOfRange { .. } => "completedModules",
            RecordError::UnknownCurrentModule(_) => "currentModule",
            RecordError::UnknownLesson(_) => "completedLessons",
            RecordError::ScoreOutOfRange(_) => "score",
        }
    }
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// Durable state of a learner's advancement through one course.
///
/// Only completed-lesson membership and module position are durable; the
/// lesson cursor inside a module is transient and lives with the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Count of fully completed modules. Also the index of the first locked module.
    pub completed_modules: u32,
    pub current_module: ModuleId,
    pub completed_lessons: BTreeSet<LessonId>,
    /// Last recorded passing quiz score (0-100).
    pub score: f64,
    pub last_activity: DateTime<Utc>,
}

impl ProgressRecord {
    /// Record for a fresh enrollment: nothing completed, positioned on the first module.
    #[must_use]
    pub fn initial(course: &Course, now: DateTime<Utc>) -> Self {
        Self {
            completed_modules: 0,
            current_module: course.first_module().id().clone(),
            completed_lessons: BTreeSet::new(),
            score: 0.0,
            last_activity: now,
        }
    }

    #[must_use]
    pub fn has_completed(&self, lesson_id: &LessonId) -> bool {
        self.completed_lessons.contains(lesson_id)
    }

    /// Checks the record against the catalog invariants of its course.
    ///
    /// # Errors
    ///
    /// Returns the first `RecordError` found.
    pub fn validate_against(&self, course: &Course) -> Result<(), RecordError> {
        let modules = course.modules().len();
        if self.completed_modules as usize > modules {
            return Err(RecordError::CompletedModulesOutOfRange {
                completed: self.completed_modules,
                modules,
            });
        }
        if course.module(&self.current_module).is_none() {
            return Err(RecordError::UnknownCurrentModule(
                self.current_module.clone(),
            ));
        }
        if let Some(unknown) = self
            .completed_lessons
            .iter()
            .find(|l| !course.contains_lesson(l))
        {
            return Err(RecordError::UnknownLesson(unknown.clone()));
        }
        if !self.score.is_finite() || !(0.0..=100.0).contains(&self.score) {
            return Err(RecordError::ScoreOutOfRange(self.score));
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
