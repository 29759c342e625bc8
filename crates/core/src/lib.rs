#![forbid(unsafe_code)]

pub mod engine;
pub mod model;
pub mod scorer;
pub mod time;

pub use engine::{Advance, AdvanceOutcome, LessonCursor, ProgressEngine, ProgressError};
pub use scorer::{Answers, AttemptError, QuizAttempt, QuizOutcome};
pub use time::Clock;
