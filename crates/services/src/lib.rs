#![forbid(unsafe_code)]

pub mod app_services;
pub mod enrollment_service;
pub mod error;
pub mod learning_service;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use enrollment_service::EnrollmentService;
pub use error::{AppServicesError, EnrollmentError};
pub use learning_service::{Certificate, LearningService, Navigation, QuizResult, QuizSubmission};
