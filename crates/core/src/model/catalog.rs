use std::collections::HashMap;

use thiserror::Error;

use crate::model::course::Course;
use crate::model::ids::{AssessmentId, CourseId, LessonId, ModuleId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("catalog is not valid JSON: {0}")]
    Parse(String),

    #[error("course {0} has an empty title")]
    EmptyTitle(CourseId),

    #[error("course {0} has no modules")]
    NoModules(CourseId),

    #[error("duplicate course id: {0}")]
    DuplicateCourse(CourseId),

    #[error("duplicate module id: {0}")]
    DuplicateModule(ModuleId),

    #[error("module {0} has no lessons")]
    EmptyModule(ModuleId),

    #[error("duplicate lesson id: {0}")]
    DuplicateLesson(LessonId),

    #[error("duplicate question id: {0}")]
    DuplicateQuestion(QuestionId),

    #[error("quiz lesson {lesson} references unknown assessment {assessment}")]
    UnknownAssessment {
        lesson: LessonId,
        assessment: AssessmentId,
    },

    #[error("assessment {assessment} belongs to unknown module {module}")]
    UnknownAssessmentModule {
        assessment: AssessmentId,
        module: ModuleId,
    },

    #[error("assessment {assessment} passing score {score} exceeds 100")]
    InvalidPassingScore { assessment: AssessmentId, score: u8 },

    #[error("question {0} correct answer is not one of its options")]
    InvalidCorrectAnswer(QuestionId),
}

//
// ─── CATALOG ───────────────────────────────────────────────────────────────────
//

/// Read-only collection of course definitions, keyed by course id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    courses: HashMap<CourseId, Course>,
}

impl Catalog {
    /// Builds a catalog from validated courses.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateCourse` if two courses share an id.
    pub fn new(courses: Vec<Course>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(courses.len());
        for course in courses {
            let id = course.id().clone();
            if by_id.insert(id.clone(), course).is_some() {
                return Err(CatalogError::DuplicateCourse(id));
            }
        }
        Ok(Self { courses: by_id })
    }

    /// Parses a JSON array of course definitions.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON or any course-level
    /// validation failure, and `DuplicateCourse` for repeated ids.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let courses: Vec<Course> =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::new(courses)
    }

    #[must_use]
    pub fn course(&self, id: &CourseId) -> Option<&Course> {
        self.courses.get(id)
    }

    /// Courses ordered by id.
    #[must_use]
    pub fn courses(&self) -> Vec<&Course> {
        let mut all: Vec<&Course> = self.courses.values().collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
