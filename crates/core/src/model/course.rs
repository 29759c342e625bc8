use std::collections::HashSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::model::catalog::CatalogError;
use crate::model::ids::{AssessmentId, CourseId, LessonId, ModuleId, QuestionId};

/// Time budget applied when an assessment does not declare one.
pub const DEFAULT_TIME_LIMIT_MINUTES: u32 = 15;

fn default_time_limit_minutes() -> u32 {
    DEFAULT_TIME_LIMIT_MINUTES
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// Type-specific payload of a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LessonKind {
    Video {
        #[serde(rename = "videoUrl")]
        video_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Reading {
        body: String,
    },
    /// Graded through the assessment scorer, never through the generic advance.
    Quiz {
        assessment: AssessmentId,
    },
    Project {
        description: String,
    },
}

impl LessonKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonKind::Video { .. } => "video",
            LessonKind::Reading { .. } => "reading",
            LessonKind::Quiz { .. } => "quiz",
            LessonKind::Project { .. } => "project",
        }
    }
}

/// An atomic unit of course content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    id: LessonId,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
    #[serde(flatten)]
    kind: LessonKind,
}

impl Lesson {
    #[must_use]
    pub fn new(id: LessonId, title: impl Into<String>, kind: LessonKind) -> Self {
        Self {
            id,
            title: title.into(),
            duration: None,
            kind,
        }
    }

    #[must_use]
    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> &LessonKind {
        &self.kind
    }

    #[must_use]
    pub fn is_quiz(&self) -> bool {
        matches!(self.kind, LessonKind::Quiz { .. })
    }
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

/// An ordered group of lessons. Completing it unlocks the next module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    id: ModuleId,
    title: String,
    lessons: Vec<Lesson>,
    #[serde(default)]
    has_assessment: bool,
}

impl Module {
    #[must_use]
    pub fn new(
        id: ModuleId,
        title: impl Into<String>,
        lessons: Vec<Lesson>,
        has_assessment: bool,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            lessons,
            has_assessment,
        }
    }

    #[must_use]
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn has_assessment(&self) -> bool {
        self.has_assessment
    }

    #[must_use]
    pub fn contains_lesson(&self, lesson_id: &LessonId) -> bool {
        self.lessons.iter().any(|l| l.id() == lesson_id)
    }

    #[must_use]
    pub fn lesson_index(&self, lesson_id: &LessonId) -> Option<usize> {
        self.lessons.iter().position(|l| l.id() == lesson_id)
    }
}

//
// ─── ASSESSMENT ────────────────────────────────────────────────────────────────
//

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: QuestionId,
    #[serde(default)]
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

/// A scored quiz attached to a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    id: AssessmentId,
    module: ModuleId,
    #[serde(default)]
    title: String,
    passing_score: u8,
    #[serde(default = "default_time_limit_minutes")]
    time_limit_minutes: u32,
    questions: Vec<Question>,
}

impl Assessment {
    #[must_use]
    pub fn new(
        id: AssessmentId,
        module: ModuleId,
        passing_score: u8,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            id,
            module,
            title: String::new(),
            passing_score,
            time_limit_minutes: DEFAULT_TIME_LIMIT_MINUTES,
            questions,
        }
    }

    #[must_use]
    pub fn with_time_limit_minutes(mut self, minutes: u32) -> Self {
        self.time_limit_minutes = minutes;
        self
    }

    #[must_use]
    pub fn id(&self) -> &AssessmentId {
        &self.id
    }

    /// Owning module.
    #[must_use]
    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Minimum percentage (0-100) required to pass.
    #[must_use]
    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }

    #[must_use]
    pub fn time_limit(&self) -> Duration {
        Duration::minutes(i64::from(self.time_limit_minutes))
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.passing_score > 100 {
            return Err(CatalogError::InvalidPassingScore {
                assessment: self.id.clone(),
                score: self.passing_score,
            });
        }
        let mut seen = HashSet::new();
        for q in &self.questions {
            if !seen.insert(&q.id) {
                return Err(CatalogError::DuplicateQuestion(q.id.clone()));
            }
            if !q.options.contains(&q.correct_answer) {
                return Err(CatalogError::InvalidCorrectAnswer(q.id.clone()));
            }
        }
        Ok(())
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseDef {
    id: CourseId,
    title: String,
    modules: Vec<Module>,
    #[serde(default)]
    assessments: Vec<Assessment>,
}

impl TryFrom<CourseDef> for Course {
    type Error = CatalogError;

    fn try_from(def: CourseDef) -> Result<Self, Self::Error> {
        Course::new(def.id, def.title, def.modules, def.assessments)
    }
}

/// Static definition of a course: ordered modules plus their assessments.
///
/// Construction validates the catalog invariants the progress engine relies on:
/// at least one module, no empty modules, unique module/lesson ids, and every
/// quiz lesson pointing at an assessment owned by its module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CourseDef", rename_all = "camelCase")]
pub struct Course {
    id: CourseId,
    title: String,
    modules: Vec<Module>,
    assessments: Vec<Assessment>,
}

impl Course {
    /// Creates a validated course.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if any catalog invariant is violated.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        modules: Vec<Module>,
        assessments: Vec<Assessment>,
    ) -> Result<Self, CatalogError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CatalogError::EmptyTitle(id));
        }
        if modules.is_empty() {
            return Err(CatalogError::NoModules(id));
        }

        let mut module_ids = HashSet::new();
        let mut lesson_ids = HashSet::new();
        for module in &modules {
            if !module_ids.insert(module.id()) {
                return Err(CatalogError::DuplicateModule(module.id().clone()));
            }
            if module.lessons().is_empty() {
                return Err(CatalogError::EmptyModule(module.id().clone()));
            }
            for lesson in module.lessons() {
                if !lesson_ids.insert(lesson.id()) {
                    return Err(CatalogError::DuplicateLesson(lesson.id().clone()));
                }
            }
        }

        for assessment in &assessments {
            if !module_ids.contains(assessment.module()) {
                return Err(CatalogError::UnknownAssessmentModule {
                    assessment: assessment.id().clone(),
                    module: assessment.module().clone(),
                });
            }
            assessment.validate()?;
        }

        for module in &modules {
            for lesson in module.lessons() {
                if let LessonKind::Quiz { assessment } = lesson.kind() {
                    let owned = assessments
                        .iter()
                        .any(|a| a.id() == assessment && a.module() == module.id());
                    if !owned {
                        return Err(CatalogError::UnknownAssessment {
                            lesson: lesson.id().clone(),
                            assessment: assessment.clone(),
                        });
                    }
                }
            }
        }

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            modules,
            assessments,
        })
    }

    #[must_use]
    pub fn id(&self) -> &CourseId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    #[must_use]
    pub fn assessments(&self) -> &[Assessment] {
        &self.assessments
    }

    /// Catalog invariant guarantees this exists.
    #[must_use]
    pub fn first_module(&self) -> &Module {
        &self.modules[0]
    }

    #[must_use]
    pub fn module(&self, module_id: &ModuleId) -> Option<&Module> {
        self.modules.iter().find(|m| m.id() == module_id)
    }

    #[must_use]
    pub fn module_index(&self, module_id: &ModuleId) -> Option<usize> {
        self.modules.iter().position(|m| m.id() == module_id)
    }

    /// Module that owns the given lesson, with its position in the course.
    #[must_use]
    pub fn module_of_lesson(&self, lesson_id: &LessonId) -> Option<(usize, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .find(|(_, m)| m.contains_lesson(lesson_id))
    }

    #[must_use]
    pub fn contains_lesson(&self, lesson_id: &LessonId) -> bool {
        self.module_of_lesson(lesson_id).is_some()
    }

    /// The assessment attached to a module, if any.
    #[must_use]
    pub fn assessment_for(&self, module_id: &ModuleId) -> Option<&Assessment> {
        self.assessments.iter().find(|a| a.module() == module_id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
