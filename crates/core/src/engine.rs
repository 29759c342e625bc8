//! Learner progress state machine.
//!
//! The engine is a pure function of (record, course, transition): every
//! operation borrows the current `ProgressRecord` and returns the next one.
//! It never performs I/O; persistence is the caller's job.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::{Course, LessonId, Module, ModuleId, ProgressRecord};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Domain-level rejections produced by the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("module {0} is locked")]
    AccessDenied(ModuleId),

    #[error("unknown module: {0}")]
    UnknownModule(ModuleId),

    #[error("unknown lesson: {0}")]
    UnknownLesson(LessonId),

    #[error("module {module} has no lesson at position {index}")]
    LessonOutOfRange { module: ModuleId, index: usize },

    #[error("quiz lesson {0} can only be completed by passing its assessment")]
    QuizRequiresSubmission(LessonId),

    #[error("lesson {0} is not a quiz")]
    NotAQuiz(LessonId),

    #[error("module {0} has no assessment")]
    NoAssessment(ModuleId),
}

//
// ─── CURSOR ────────────────────────────────────────────────────────────────────
//

/// Position of the learner inside a module. Transient: never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCursor {
    pub module: ModuleId,
    pub lesson_index: usize,
}

impl LessonCursor {
    #[must_use]
    pub fn new(module: ModuleId, lesson_index: usize) -> Self {
        Self {
            module,
            lesson_index,
        }
    }

    /// Cursor on the first lesson of a module.
    #[must_use]
    pub fn start_of(module: ModuleId) -> Self {
        Self::new(module, 0)
    }
}

//
// ─── ADVANCE ───────────────────────────────────────────────────────────────────
//

/// What happened when the learner moved past a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AdvanceOutcome {
    /// Cursor moved to the next lesson of the same module.
    NextLesson,
    /// Last lesson reached but some lessons are still open; nothing advanced.
    ModuleIncomplete { remaining: Vec<LessonId> },
    /// Module completed and the learner now sits on the next one.
    ModuleCompleted { next_module: ModuleId },
    /// Final module completed. Caller hands off to certificate issuance.
    CourseCompleted,
}

/// Result of an advance: the next record, the next cursor, and the outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advance {
    pub record: ProgressRecord,
    pub cursor: LessonCursor,
    pub outcome: AdvanceOutcome,
}

//
// ─── OVERVIEW ──────────────────────────────────────────────────────────────────
//

/// Derived per-module facts for a learner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStatus {
    pub id: ModuleId,
    pub title: String,
    pub accessible: bool,
    pub completed: bool,
    pub current: bool,
    pub lessons_completed: usize,
    pub lessons_total: usize,
    pub fraction: f64,
}

/// Derived course-level facts for a learner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOverview {
    pub completion_percent: f64,
    pub course_complete: bool,
    pub modules: Vec<ModuleStatus>,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Progress rules for one course.
#[derive(Debug, Clone, Copy)]
pub struct ProgressEngine<'a> {
    course: &'a Course,
}

impl<'a> ProgressEngine<'a> {
    #[must_use]
    pub fn new(course: &'a Course) -> Self {
        Self { course }
    }

    #[must_use]
    pub fn course(&self) -> &'a Course {
        self.course
    }

    /// Module 0 is always open; module `i` opens once `i` modules are complete.
    #[must_use]
    pub fn is_module_accessible(module_index: usize, record: &ProgressRecord) -> bool {
        module_index == 0 || record.completed_modules as usize >= module_index
    }

    /// Share of the module's lessons the learner has completed, in `[0, 1]`.
    ///
    /// Returns 0 for a module without lessons.
    #[must_use]
    pub fn module_progress_fraction(module: &Module, record: &ProgressRecord) -> f64 {
        let total = module.lessons().len();
        if total == 0 {
            return 0.0;
        }
        let done = completed_in(module, record);
        #[allow(clippy::cast_precision_loss)]
        let fraction = done as f64 / total as f64;
        fraction
    }

    #[must_use]
    pub fn is_course_complete(&self, record: &ProgressRecord) -> bool {
        record.completed_modules as usize == self.course.modules().len()
    }

    /// Marks a lesson completed.
    ///
    /// Completing an already completed lesson returns the record unchanged.
    ///
    /// # Errors
    ///
    /// `UnknownLesson` if the lesson is not in the course, `AccessDenied` if
    /// its module is still locked.
    pub fn complete_lesson(
        &self,
        lesson_id: &LessonId,
        record: &ProgressRecord,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, ProgressError> {
        let (index, module) = self
            .course
            .module_of_lesson(lesson_id)
            .ok_or_else(|| ProgressError::UnknownLesson(lesson_id.clone()))?;
        if !Self::is_module_accessible(index, record) {
            return Err(ProgressError::AccessDenied(module.id().clone()));
        }
        if record.has_completed(lesson_id) {
            return Ok(record.clone());
        }

        let mut next = record.clone();
        next.completed_lessons.insert(lesson_id.clone());
        next.last_activity = now;
        Ok(next)
    }

    /// Marks a module completed and moves the learner onto the following module.
    ///
    /// `completed_modules` never decreases. On the last module the current
    /// module stays put; the caller detects course completion.
    ///
    /// # Errors
    ///
    /// `UnknownModule` if the module is not in the course.
    pub fn complete_module(
        &self,
        module_id: &ModuleId,
        record: &ProgressRecord,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, ProgressError> {
        let index = self.module_index(module_id)?;
        let reached = u32::try_from(index + 1).unwrap_or(u32::MAX);

        let mut next = record.clone();
        next.completed_modules = next.completed_modules.max(reached);
        next.current_module = self
            .course
            .modules()
            .get(index + 1)
            .map_or_else(|| module_id.clone(), |m| m.id().clone());
        next.last_activity = now;
        Ok(next)
    }

    /// Moves the learner to another module.
    ///
    /// The lesson cursor resets to the first lesson of that module; the cursor
    /// is not part of the record.
    ///
    /// # Errors
    ///
    /// `AccessDenied` if the module is locked, `UnknownModule` if it does not exist.
    pub fn navigate_to_module(
        &self,
        module_id: &ModuleId,
        record: &ProgressRecord,
        now: DateTime<Utc>,
    ) -> Result<(ProgressRecord, LessonCursor), ProgressError> {
        let index = self.module_index(module_id)?;
        if !Self::is_module_accessible(index, record) {
            return Err(ProgressError::AccessDenied(module_id.clone()));
        }

        let mut next = record.clone();
        next.current_module = module_id.clone();
        next.last_activity = now;
        Ok((next, LessonCursor::start_of(module_id.clone())))
    }

    /// The "Next" action: completes the lesson under the cursor and moves on.
    ///
    /// On the module's last lesson the module is completed once every lesson
    /// is done, and the learner lands on the next module (or the course is
    /// reported complete). Quiz lessons are rejected here; they advance only
    /// through [`ProgressEngine::record_quiz_pass`].
    ///
    /// # Errors
    ///
    /// `UnknownModule`, `AccessDenied`, `LessonOutOfRange`, or
    /// `QuizRequiresSubmission`.
    pub fn advance(
        &self,
        cursor: &LessonCursor,
        record: &ProgressRecord,
        now: DateTime<Utc>,
    ) -> Result<Advance, ProgressError> {
        let (module_index, lesson_id, is_quiz) = self.lesson_at(cursor, record)?;
        if is_quiz {
            return Err(ProgressError::QuizRequiresSubmission(lesson_id));
        }

        let record = self.complete_lesson(&lesson_id, record, now)?;
        self.finish_lesson(module_index, cursor, &lesson_id, record, now)
    }

    /// Completion callback for a passed quiz: completes the quiz lesson,
    /// records the score, then continues exactly like [`ProgressEngine::advance`].
    ///
    /// Only call this for a passing attempt; failed attempts leave the record untouched.
    ///
    /// # Errors
    ///
    /// `NotAQuiz` if the cursor is not on a quiz lesson, plus the cursor errors
    /// of [`ProgressEngine::advance`].
    pub fn record_quiz_pass(
        &self,
        cursor: &LessonCursor,
        score: f64,
        record: &ProgressRecord,
        now: DateTime<Utc>,
    ) -> Result<Advance, ProgressError> {
        let (module_index, lesson_id, is_quiz) = self.lesson_at(cursor, record)?;
        if !is_quiz {
            return Err(ProgressError::NotAQuiz(lesson_id));
        }

        let mut record = self.complete_lesson(&lesson_id, record, now)?;
        record.score = score.clamp(0.0, 100.0);
        record.last_activity = now;
        self.finish_lesson(module_index, cursor, &lesson_id, record, now)
    }

    /// Per-module accessibility and completion, plus the overall percentage.
    #[must_use]
    pub fn overview(&self, record: &ProgressRecord) -> ProgressOverview {
        let modules: Vec<ModuleStatus> = self
            .course
            .modules()
            .iter()
            .enumerate()
            .map(|(index, module)| ModuleStatus {
                id: module.id().clone(),
                title: module.title().to_owned(),
                accessible: Self::is_module_accessible(index, record),
                completed: (record.completed_modules as usize) > index,
                current: &record.current_module == module.id(),
                lessons_completed: completed_in(module, record),
                lessons_total: module.lessons().len(),
                fraction: Self::module_progress_fraction(module, record),
            })
            .collect();

        #[allow(clippy::cast_precision_loss)]
        let completion_percent =
            f64::from(record.completed_modules) / modules.len().max(1) as f64 * 100.0;

        ProgressOverview {
            completion_percent: completion_percent.min(100.0),
            course_complete: self.is_course_complete(record),
            modules,
        }
    }

    fn module_index(&self, module_id: &ModuleId) -> Result<usize, ProgressError> {
        self.course
            .module_index(module_id)
            .ok_or_else(|| ProgressError::UnknownModule(module_id.clone()))
    }

    /// Resolves the cursor to (module index, lesson id, is quiz), checking access.
    fn lesson_at(
        &self,
        cursor: &LessonCursor,
        record: &ProgressRecord,
    ) -> Result<(usize, LessonId, bool), ProgressError> {
        let module_index = self.module_index(&cursor.module)?;
        if !Self::is_module_accessible(module_index, record) {
            return Err(ProgressError::AccessDenied(cursor.module.clone()));
        }
        let lesson = self.course.modules()[module_index]
            .lessons()
            .get(cursor.lesson_index)
            .ok_or_else(|| ProgressError::LessonOutOfRange {
                module: cursor.module.clone(),
                index: cursor.lesson_index,
            })?;
        Ok((module_index, lesson.id().clone(), lesson.is_quiz()))
    }

    fn finish_lesson(
        &self,
        module_index: usize,
        cursor: &LessonCursor,
        finished: &LessonId,
        record: ProgressRecord,
        now: DateTime<Utc>,
    ) -> Result<Advance, ProgressError> {
        let module = &self.course.modules()[module_index];

        if cursor.lesson_index + 1 < module.lessons().len() {
            return Ok(Advance {
                record,
                cursor: LessonCursor::new(cursor.module.clone(), cursor.lesson_index + 1),
                outcome: AdvanceOutcome::NextLesson,
            });
        }

        // Inclusive check: the lesson just finished counts even if the set lags.
        let remaining: Vec<LessonId> = module
            .lessons()
            .iter()
            .map(|l| l.id())
            .filter(|id| *id != finished && !record.has_completed(id))
            .cloned()
            .collect();
        if !remaining.is_empty() {
            return Ok(Advance {
                record,
                cursor: cursor.clone(),
                outcome: AdvanceOutcome::ModuleIncomplete { remaining },
            });
        }

        let record = self.complete_module(module.id(), &record, now)?;
        match self.course.modules().get(module_index + 1) {
            Some(next) => {
                let (record, cursor) = self.navigate_to_module(next.id(), &record, now)?;
                Ok(Advance {
                    record,
                    cursor,
                    outcome: AdvanceOutcome::ModuleCompleted {
                        next_module: next.id().clone(),
                    },
                })
            }
            None => Ok(Advance {
                record,
                cursor: cursor.clone(),
                outcome: AdvanceOutcome::CourseCompleted,
            }),
        }
    }
}

fn completed_in(module: &Module, record: &ProgressRecord) -> usize {
    module
        .lessons()
        .iter()
        .filter(|l| record.has_completed(l.id()))
        .count()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
