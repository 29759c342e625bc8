pub mod catalog;
mod course;
mod enrollment;
mod ids;
mod progress;

pub use catalog::{Catalog, CatalogError};
pub use ids::{
    AssessmentId, CourseId, EnrollmentId, LessonId, ModuleId, ParseIdError, QuestionId, UserId,
};

pub use course::{
    Assessment, Course, DEFAULT_TIME_LIMIT_MINUTES, Lesson, LessonKind, Module, Question,
};
pub use enrollment::{Enrollment, EnrollmentError, EnrollmentStatus};
pub use progress::{ProgressRecord, RecordError};
