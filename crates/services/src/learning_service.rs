//! Learner-driven transitions: lesson completion, "Next", module navigation,
//! quiz submission and certificate eligibility.
//!
//! Every transition reads the enrollment with its revision, runs the pure
//! engine, and writes back at most once through the revision-checked path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use course_core::model::{
    Catalog, CourseId, Enrollment, Lesson, LessonId, LessonKind, ModuleId, ProgressRecord, UserId,
};
use course_core::{
    Advance, Answers, AttemptError, LessonCursor, ProgressEngine, ProgressError, QuizAttempt,
    QuizOutcome,
};
use storage::repository::EnrollmentRepository;

use crate::Clock;
use crate::enrollment_service::{course_for, load_enrollment};
use crate::error::EnrollmentError;

/// Answers for one module assessment.
#[derive(Debug, Clone)]
pub struct QuizSubmission {
    pub module_id: ModuleId,
    pub answers: Answers,
    /// Position of the quiz lesson; located from the module when absent.
    pub lesson_index: Option<usize>,
    /// When the attempt started; the submission time when absent.
    pub started_at: Option<DateTime<Utc>>,
}

/// Graded attempt, plus the resulting transition when it passed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub outcome: QuizOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advance: Option<Advance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    pub record: ProgressRecord,
    pub cursor: LessonCursor,
}

/// Certificate eligibility for one enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct LearningService {
    clock: Clock,
    catalog: Arc<Catalog>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl LearningService {
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

    /// Marks a single lesson completed (e.g. a video that played to the end).
    ///
    /// # Errors
    ///
    /// `NotFound` when not enrolled, `AccessDenied` for a locked module,
    /// `Progress` for an unknown lesson, `Conflict` on a concurrent write.
    pub async fn complete_lesson(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        lesson_id: &LessonId,
    ) -> Result<ProgressRecord, EnrollmentError> {
        let enrollment = self.load(user_id, course_id).await?;
        let course = course_for(&self.catalog, course_id)?;

        let next = ProgressEngine::new(course).complete_lesson(
            lesson_id,
            &enrollment.progress,
            self.clock.now(),
        )?;
        self.commit(&enrollment, &next).await?;
        Ok(next)
    }

    /// The "Next" action on the lesson under `cursor`.
    ///
    /// # Errors
    ///
    /// `NotFound` when not enrolled, `AccessDenied` for a locked module,
    /// `Progress` for a bad cursor or a quiz lesson, `Conflict` on a
    /// concurrent write.
    pub async fn advance(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        cursor: &LessonCursor,
    ) -> Result<Advance, EnrollmentError> {
        let enrollment = self.load(user_id, course_id).await?;
        let course = course_for(&self.catalog, course_id)?;

        let step = ProgressEngine::new(course).advance(
            cursor,
            &enrollment.progress,
            self.clock.now(),
        )?;
        self.commit(&enrollment, &step.record).await?;
        Ok(step)
    }

    /// Moves the learner to an accessible module.
    ///
    /// # Errors
    ///
    /// `AccessDenied` for a locked module (the record is left untouched),
    /// `Progress` for an unknown module, `NotFound` when not enrolled.
    pub async fn navigate(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        module_id: &ModuleId,
    ) -> Result<Navigation, EnrollmentError> {
        let enrollment = self.load(user_id, course_id).await?;
        let course = course_for(&self.catalog, course_id)?;

        let (record, cursor) = ProgressEngine::new(course).navigate_to_module(
            module_id,
            &enrollment.progress,
            self.clock.now(),
        )?;
        self.commit(&enrollment, &record).await?;
        Ok(Navigation { record, cursor })
    }

    /// Grades a quiz attempt. A pass completes the quiz lesson, records the
    /// score and continues like "Next"; a fail writes nothing.
    ///
    /// # Errors
    ///
    /// `AccessDenied` for a locked module, `Validation` for answers to
    /// questions outside the assessment, `Progress` when the module has no
    /// assessment or `lesson_index` is not its quiz lesson, `Conflict` on a
    /// concurrent write.
    pub async fn submit_quiz(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        submission: QuizSubmission,
    ) -> Result<QuizResult, EnrollmentError> {
        let enrollment = self.load(user_id, course_id).await?;
        let course = course_for(&self.catalog, course_id)?;
        let engine = ProgressEngine::new(course);
        let module_id = &submission.module_id;

        let module_index = course
            .module_index(module_id)
            .ok_or_else(|| ProgressError::UnknownModule(module_id.clone()))?;
        if !ProgressEngine::is_module_accessible(module_index, &enrollment.progress) {
            return Err(EnrollmentError::AccessDenied(module_id.clone()));
        }
        let assessment = course
            .assessment_for(module_id)
            .ok_or_else(|| ProgressError::NoAssessment(module_id.clone()))?;

        if let Some(unknown) = submission
            .answers
            .keys()
            .find(|q| !assessment.questions().iter().any(|known| &known.id == *q))
        {
            return Err(AttemptError::UnknownQuestion(unknown.clone()).into());
        }

        let lessons = course.modules()[module_index].lessons();
        let is_this_quiz = |lesson: &Lesson| {
            matches!(lesson.kind(), LessonKind::Quiz { assessment: a } if a == assessment.id())
        };
        // The index must name this assessment's quiz, whatever the grade.
        let lesson_index = match submission.lesson_index {
            Some(index) => {
                let lesson = lessons.get(index).ok_or_else(|| ProgressError::LessonOutOfRange {
                    module: module_id.clone(),
                    index,
                })?;
                if !is_this_quiz(lesson) {
                    return Err(ProgressError::NotAQuiz(lesson.id().clone()).into());
                }
                index
            }
            None => lessons
                .iter()
                .position(is_this_quiz)
                .ok_or_else(|| ProgressError::NoAssessment(module_id.clone()))?,
        };

        let now = self.clock.now();
        let started_at = submission.started_at.unwrap_or(now).min(now);
        let outcome = QuizAttempt::with_answers(assessment, started_at, submission.answers).submit(now);

        tracing::info!(
            user_id = %user_id,
            course_id = %course_id,
            module_id = %module_id,
            score = outcome.score,
            passed = outcome.passed,
            forced = outcome.forced,
            "quiz graded"
        );

        if !outcome.passed {
            return Ok(QuizResult {
                outcome,
                advance: None,
            });
        }

        let cursor = LessonCursor::new(module_id.clone(), lesson_index);
        let step = engine.record_quiz_pass(&cursor, outcome.score, &enrollment.progress, now)?;
        self.commit(&enrollment, &step.record).await?;
        Ok(QuizResult {
            outcome,
            advance: Some(step),
        })
    }

    /// Whether the learner has completed every module of the course.
    ///
    /// # Errors
    ///
    /// `NotFound` when not enrolled.
    pub async fn course_completion(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Certificate, EnrollmentError> {
        let enrollment = self.load(user_id, course_id).await?;
        let course = course_for(&self.catalog, course_id)?;

        let eligible = ProgressEngine::new(course).is_course_complete(&enrollment.progress);
        Ok(Certificate {
            eligible,
            completed_at: eligible.then_some(enrollment.progress.last_activity),
        })
    }

    async fn load(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Enrollment, EnrollmentError> {
        load_enrollment(self.enrollments.as_ref(), user_id, course_id).await
    }

    /// Writes `next` if it differs from what was read, failing on a stale revision.
    async fn commit(
        &self,
        enrollment: &Enrollment,
        next: &ProgressRecord,
    ) -> Result<(), EnrollmentError> {
        if *next == enrollment.progress {
            return Ok(());
        }
        let revision = self
            .enrollments
            .update_progress_if_revision(
                &enrollment.user_id,
                &enrollment.course_id,
                next,
                enrollment.revision,
                self.clock.now(),
            )
            .await
            .inspect_err(|err| {
                tracing::warn!(
                    user_id = %enrollment.user_id,
                    course_id = %enrollment.course_id,
                    expected_revision = enrollment.revision,
                    error = %err,
                    "progress write rejected"
                );
            })?;

        if next.completed_modules > enrollment.progress.completed_modules {
            tracing::info!(
                user_id = %enrollment.user_id,
                course_id = %enrollment.course_id,
                completed_modules = next.completed_modules,
                revision,
                "module completed"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use course_core::AdvanceOutcome;
    use course_core::model::{
        Assessment, AssessmentId, Course, Lesson, Module, Question, QuestionId,
    };
    use course_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    use crate::EnrollmentService;

    fn mid(id: &str) -> ModuleId {
        ModuleId::new(id).unwrap()
    }

    fn lid(id: &str) -> LessonId {
        LessonId::new(id).unwrap()
    }

    fn qid(id: &str) -> QuestionId {
        QuestionId::new(id).unwrap()
    }

    fn video(id: &str) -> Lesson {
        Lesson::new(
            lid(id),
            id,
            LessonKind::Video {
                video_url: format!("/videos/{id}.mp4"),
                description: None,
            },
        )
    }

    /// module-1: [L1, L2], module-2: [L3, Q1 (quiz, 2 questions, pass 50)]
    fn catalog() -> Arc<Catalog> {
        let assessment = Assessment::new(
            AssessmentId::new("final").unwrap(),
            mid("module-2"),
            50,
            ["q1", "q2"]
                .iter()
                .map(|q| Question {
                    id: qid(q),
                    prompt: format!("{q}?"),
                    options: vec!["a".into(), "b".into()],
                    correct_answer: "a".into(),
                    explanation: String::new(),
                })
                .collect(),
        );
        let course = Course::new(
            CourseId::new("revops").unwrap(),
            "Revenue Operations",
            vec![
                Module::new(mid("module-1"), "One", vec![video("L1"), video("L2")], false),
                Module::new(
                    mid("module-2"),
                    "Two",
                    vec![
                        video("L3"),
                        Lesson::new(
                            lid("Q1"),
                            "Final quiz",
                            LessonKind::Quiz {
                                assessment: AssessmentId::new("final").unwrap(),
                            },
                        ),
                    ],
                    true,
                ),
            ],
            vec![assessment],
        )
        .unwrap();
        Arc::new(Catalog::new(vec![course]).unwrap())
    }

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn revops() -> CourseId {
        CourseId::new("revops").unwrap()
    }

    async fn enrolled() -> (LearningService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let clock = Clock::fixed(fixed_now() + Duration::minutes(1));
        let catalog = catalog();
        EnrollmentService::new(clock, Arc::clone(&catalog), Arc::new(repo.clone()))
            .enroll(&user(), None, "revops", None)
            .await
            .unwrap();
        (
            LearningService::new(clock, catalog, Arc::new(repo.clone())),
            repo,
        )
    }

    async fn stored(repo: &InMemoryRepository) -> Enrollment {
        repo.find_enrollment(&user(), &revops())
            .await
            .unwrap()
            .unwrap()
    }

    fn answers(pairs: &[(&str, &str)]) -> Answers {
        pairs
            .iter()
            .map(|(q, a)| (qid(q), (*a).to_owned()))
            .collect()
    }

    async fn finish_module_one(svc: &LearningService) {
        let step = svc
            .advance(&user(), &revops(), &LessonCursor::start_of(mid("module-1")))
            .await
            .unwrap();
        svc.advance(&user(), &revops(), &step.cursor).await.unwrap();
    }

    #[tokio::test]
    async fn advancing_through_module_one_unlocks_module_two() {
        let (svc, repo) = enrolled().await;

        let step = svc
            .advance(&user(), &revops(), &LessonCursor::start_of(mid("module-1")))
            .await
            .unwrap();
        assert_eq!(step.outcome, AdvanceOutcome::NextLesson);
        assert_eq!(step.cursor, LessonCursor::new(mid("module-1"), 1));

        let step = svc.advance(&user(), &revops(), &step.cursor).await.unwrap();
        assert_eq!(
            step.outcome,
            AdvanceOutcome::ModuleCompleted {
                next_module: mid("module-2")
            }
        );

        let enrollment = stored(&repo).await;
        assert_eq!(enrollment.progress.completed_modules, 1);
        assert_eq!(enrollment.progress.current_module, mid("module-2"));
        assert_eq!(enrollment.revision, 2);
    }

    #[tokio::test]
    async fn navigating_to_locked_module_is_denied_without_a_write() {
        let (svc, repo) = enrolled().await;
        let before = stored(&repo).await;

        let err = svc
            .navigate(&user(), &revops(), &mid("module-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentError::AccessDenied(m) if m == mid("module-2")));
        assert_eq!(stored(&repo).await, before);
    }

    #[tokio::test]
    async fn navigate_resets_cursor() {
        let (svc, _) = enrolled().await;
        finish_module_one(&svc).await;

        let nav = svc
            .navigate(&user(), &revops(), &mid("module-1"))
            .await
            .unwrap();
        assert_eq!(nav.cursor, LessonCursor::start_of(mid("module-1")));
        assert_eq!(nav.record.current_module, mid("module-1"));
        assert_eq!(nav.record.completed_modules, 1);
    }

    #[tokio::test]
    async fn completing_a_lesson_twice_writes_once() {
        let (svc, repo) = enrolled().await;
        svc.complete_lesson(&user(), &revops(), &lid("L2"))
            .await
            .unwrap();
        svc.complete_lesson(&user(), &revops(), &lid("L2"))
            .await
            .unwrap();

        let enrollment = stored(&repo).await;
        assert!(enrollment.progress.has_completed(&lid("L2")));
        assert_eq!(enrollment.revision, 1);
    }

    #[tokio::test]
    async fn failed_quiz_leaves_progress_untouched() {
        let (svc, repo) = enrolled().await;
        finish_module_one(&svc).await;
        let before = stored(&repo).await;

        let result = svc
            .submit_quiz(
                &user(),
                &revops(),
                QuizSubmission {
                    module_id: mid("module-2"),
                    answers: answers(&[("q1", "b"), ("q2", "b")]),
                    lesson_index: None,
                    started_at: None,
                },
            )
            .await
            .unwrap();
        assert!(!result.outcome.passed);
        assert_eq!(result.outcome.score, 0.0);
        assert!(result.advance.is_none());
        assert_eq!(stored(&repo).await, before);
    }

    #[tokio::test]
    async fn passing_final_quiz_completes_the_course() {
        let (svc, repo) = enrolled().await;
        finish_module_one(&svc).await;
        svc.advance(&user(), &revops(), &LessonCursor::start_of(mid("module-2")))
            .await
            .unwrap();

        let result = svc
            .submit_quiz(
                &user(),
                &revops(),
                QuizSubmission {
                    module_id: mid("module-2"),
                    answers: answers(&[("q1", "a"), ("q2", "b")]),
                    lesson_index: Some(1),
                    started_at: Some(fixed_now()),
                },
            )
            .await
            .unwrap();
        assert!(result.outcome.passed);
        assert!(!result.outcome.forced);
        let step = result.advance.unwrap();
        assert_eq!(step.outcome, AdvanceOutcome::CourseCompleted);

        let enrollment = stored(&repo).await;
        assert_eq!(enrollment.progress.completed_modules, 2);
        assert!((enrollment.progress.score - 50.0).abs() < f64::EPSILON);

        let certificate = svc.course_completion(&user(), &revops()).await.unwrap();
        assert!(certificate.eligible);
        assert_eq!(
            certificate.completed_at,
            Some(enrollment.progress.last_activity)
        );
    }

    #[tokio::test]
    async fn expired_attempt_is_graded_as_forced_submission() {
        let (svc, _) = enrolled().await;
        finish_module_one(&svc).await;

        let result = svc
            .submit_quiz(
                &user(),
                &revops(),
                QuizSubmission {
                    module_id: mid("module-2"),
                    answers: answers(&[("q1", "a")]),
                    lesson_index: None,
                    started_at: Some(fixed_now() - Duration::hours(1)),
                },
            )
            .await
            .unwrap();
        assert!(result.outcome.forced);
        assert!(result.outcome.passed);
    }

    #[tokio::test]
    async fn quiz_on_locked_module_is_denied() {
        let (svc, _) = enrolled().await;
        let err = svc
            .submit_quiz(
                &user(),
                &revops(),
                QuizSubmission {
                    module_id: mid("module-2"),
                    answers: answers(&[("q1", "a"), ("q2", "a")]),
                    lesson_index: None,
                    started_at: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn quiz_rejects_unknown_questions_and_modules_without_assessment() {
        let (svc, _) = enrolled().await;
        finish_module_one(&svc).await;

        let err = svc
            .submit_quiz(
                &user(),
                &revops(),
                QuizSubmission {
                    module_id: mid("module-2"),
                    answers: answers(&[("q9", "a")]),
                    lesson_index: None,
                    started_at: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentError::Validation { field: "answers", .. }));

        let err = svc
            .submit_quiz(
                &user(),
                &revops(),
                QuizSubmission {
                    module_id: mid("module-1"),
                    answers: Answers::new(),
                    lesson_index: None,
                    started_at: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EnrollmentError::Progress(ProgressError::NoAssessment(_))
        ));
    }

    #[tokio::test]
    async fn lesson_index_off_the_quiz_is_rejected_before_grading() {
        let (svc, repo) = enrolled().await;
        finish_module_one(&svc).await;
        let before = stored(&repo).await;

        for passing in [false, true] {
            let answer = if passing { "a" } else { "b" };
            let err = svc
                .submit_quiz(
                    &user(),
                    &revops(),
                    QuizSubmission {
                        module_id: mid("module-2"),
                        answers: answers(&[("q1", answer), ("q2", answer)]),
                        lesson_index: Some(0),
                        started_at: None,
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                EnrollmentError::Progress(ProgressError::NotAQuiz(ref l)) if *l == lid("L3")
            ));
        }

        let err = svc
            .submit_quiz(
                &user(),
                &revops(),
                QuizSubmission {
                    module_id: mid("module-2"),
                    answers: answers(&[("q1", "b")]),
                    lesson_index: Some(7),
                    started_at: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EnrollmentError::Progress(ProgressError::LessonOutOfRange { index: 7, .. })
        ));
        assert_eq!(stored(&repo).await, before);
    }

    #[tokio::test]
    async fn incomplete_course_is_not_eligible_for_certificate() {
        let (svc, _) = enrolled().await;
        let certificate = svc.course_completion(&user(), &revops()).await.unwrap();
        assert_eq!(
            certificate,
            Certificate {
                eligible: false,
                completed_at: None
            }
        );
    }

    #[tokio::test]
    async fn stale_revision_surfaces_as_conflict() {
        let (svc, repo) = enrolled().await;
        let enrollment = stored(&repo).await;
        let record = ProgressEngine::new(catalog().course(&revops()).unwrap())
            .complete_lesson(&lid("L1"), &enrollment.progress, fixed_now())
            .unwrap();
        // Another writer landed after our read.
        repo.update_progress(&user(), &revops(), &enrollment.progress, fixed_now())
            .await
            .unwrap();

        let err = svc.commit(&enrollment, &record).await.unwrap_err();
        assert!(matches!(err, EnrollmentError::Conflict));
    }
}
