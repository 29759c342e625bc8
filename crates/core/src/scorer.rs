//! Assessment grading.
//!
//! Scoring is a percentage of questions answered correctly. Passing is an
//! inclusive threshold against the assessment's passing score. A failed
//! attempt never touches progress; the learner simply retries with a fresh
//! answer set.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::{Assessment, AssessmentId, QuestionId};

/// Submitted answers, keyed by question.
pub type Answers = HashMap<QuestionId, String>;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("time budget for assessment {0} has elapsed")]
    AttemptExpired(AssessmentId),

    #[error("question {0} is not part of this assessment")]
    UnknownQuestion(QuestionId),
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

/// Percentage (0-100) of questions whose submitted answer matches exactly.
///
/// Unanswered questions count as incorrect. An assessment without questions scores 0.
#[must_use]
pub fn score(answers: &Answers, assessment: &Assessment) -> f64 {
    let total = assessment.questions().len();
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let percentage = correct_count(answers, assessment) as f64 / total as f64 * 100.0;
    percentage
}

/// Inclusive pass check: `percentage >= passing_score`.
#[must_use]
pub fn has_passed(percentage: f64, passing_score: u8) -> bool {
    percentage >= f64::from(passing_score)
}

fn correct_count(answers: &Answers, assessment: &Assessment) -> usize {
    assessment
        .questions()
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.correct_answer))
        .count()
}

/// Graded result of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub score: f64,
    pub passed: bool,
    pub correct: usize,
    pub total: usize,
    /// Submitted because the time budget ran out.
    pub forced: bool,
}

/// Grades answers against an assessment.
#[must_use]
pub fn grade(answers: &Answers, assessment: &Assessment) -> QuizOutcome {
    let score = score(answers, assessment);
    QuizOutcome {
        score,
        passed: has_passed(score, assessment.passing_score()),
        correct: correct_count(answers, assessment),
        total: assessment.questions().len(),
        forced: false,
    }
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// An in-progress quiz attempt with a countdown since it started.
///
/// When the budget elapses, further answers are refused and [`QuizAttempt::submit`]
/// grades whatever was collected, flagging the outcome as forced.
#[derive(Debug, Clone)]
pub struct QuizAttempt<'a> {
    assessment: &'a Assessment,
    started_at: DateTime<Utc>,
    answers: Answers,
}

impl<'a> QuizAttempt<'a> {
    /// Starts an empty attempt.
    #[must_use]
    pub fn start(assessment: &'a Assessment, started_at: DateTime<Utc>) -> Self {
        Self::with_answers(assessment, started_at, Answers::new())
    }

    /// Rebuilds an attempt from answers collected elsewhere (e.g. a client).
    #[must_use]
    pub fn with_answers(
        assessment: &'a Assessment,
        started_at: DateTime<Utc>,
        answers: Answers,
    ) -> Self {
        Self {
            assessment,
            started_at,
            answers,
        }
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + self.assessment.time_limit()
    }

    /// Time left before forced submission; zero once elapsed.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.deadline() - now).max(Duration::zero())
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline()
    }

    #[must_use]
    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    /// Records (or replaces) the answer for one question.
    ///
    /// # Errors
    ///
    /// `AttemptExpired` once the budget has elapsed, `UnknownQuestion` for a
    /// question outside the assessment.
    pub fn answer(
        &mut self,
        question: QuestionId,
        option: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), AttemptError> {
        if self.is_expired(now) {
            return Err(AttemptError::AttemptExpired(self.assessment.id().clone()));
        }
        if !self.assessment.questions().iter().any(|q| q.id == question) {
            return Err(AttemptError::UnknownQuestion(question));
        }
        self.answers.insert(question, option.into());
        Ok(())
    }

    /// Grades the attempt. Never fails: an expired attempt is a forced submission.
    #[must_use]
    pub fn submit(self, now: DateTime<Utc>) -> QuizOutcome {
        let mut outcome = grade(&self.answers, self.assessment);
        outcome.forced = self.is_expired(now);
        outcome
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModuleId, Question};
    use crate::time::fixed_now;

    fn qid(id: &str) -> QuestionId {
        QuestionId::new(id).unwrap()
    }

    fn assessment(passing: u8, questions: usize) -> Assessment {
        let questions = (1..=questions)
            .map(|i| Question {
                id: qid(&format!("q{i}")),
                prompt: format!("Question {i}"),
                options: vec!["right".into(), "wrong".into()],
                correct_answer: "right".into(),
                explanation: String::new(),
            })
            .collect();
        Assessment::new(
            AssessmentId::new("a1").unwrap(),
            ModuleId::new("m1").unwrap(),
            passing,
            questions,
        )
    }

    fn all_correct(a: &Assessment) -> Answers {
        a.questions()
            .iter()
            .map(|q| (q.id.clone(), q.correct_answer.clone()))
            .collect()
    }

    #[test]
    fn all_correct_answers_score_100() {
        let a = assessment(80, 5);
        assert!((score(&all_correct(&a), &a) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_answers_score_0() {
        let a = assessment(80, 5);
        assert_eq!(score(&Answers::new(), &a), 0.0);
    }

    #[test]
    fn missing_and_wrong_answers_count_as_incorrect() {
        let a = assessment(80, 4);
        let mut answers = Answers::new();
        answers.insert(qid("q1"), "right".into());
        answers.insert(qid("q2"), "wrong".into());
        answers.insert(qid("q3"), "right".into());

        let outcome = grade(&answers, &a);
        assert!((outcome.score - 50.0).abs() < f64::EPSILON);
        assert_eq!((outcome.correct, outcome.total), (2, 4));
        assert!(!outcome.passed);
    }

    #[test]
    fn assessment_without_questions_scores_0() {
        let a = assessment(0, 0);
        assert_eq!(score(&Answers::new(), &a), 0.0);
    }

    #[test]
    fn pass_boundary_is_inclusive() {
        assert!(has_passed(80.0, 80));
        assert!(!has_passed(79.0, 80));
        assert!(has_passed(100.0, 100));
        assert!(has_passed(0.0, 0));
    }

    #[test]
    fn grade_uses_assessment_threshold() {
        let a = assessment(80, 5);
        let mut answers = all_correct(&a);
        answers.remove(&qid("q5"));
        let outcome = grade(&answers, &a);
        assert!((outcome.score - 80.0).abs() < f64::EPSILON);
        assert!(outcome.passed);
    }

    #[test]
    fn attempt_collects_answers_within_budget() {
        let a = assessment(50, 2);
        let mut attempt = QuizAttempt::start(&a, fixed_now());
        attempt
            .answer(qid("q1"), "right", fixed_now() + Duration::minutes(1))
            .unwrap();
        assert_eq!(attempt.remaining(fixed_now()), Duration::minutes(15));

        let outcome = attempt.submit(fixed_now() + Duration::minutes(2));
        assert!(outcome.passed);
        assert!(!outcome.forced);
    }

    #[test]
    fn attempt_rejects_unknown_question() {
        let a = assessment(50, 2);
        let mut attempt = QuizAttempt::start(&a, fixed_now());
        let err = attempt.answer(qid("q9"), "right", fixed_now()).unwrap_err();
        assert_eq!(err, AttemptError::UnknownQuestion(qid("q9")));
    }

    #[test]
    fn expired_attempt_refuses_answers_and_forces_submission() {
        let a = assessment(50, 2).with_time_limit_minutes(1);
        let mut attempt = QuizAttempt::start(&a, fixed_now());
        attempt.answer(qid("q1"), "right", fixed_now()).unwrap();

        let late = fixed_now() + Duration::minutes(2);
        assert!(attempt.is_expired(late));
        assert_eq!(attempt.remaining(late), Duration::zero());
        assert!(matches!(
            attempt.answer(qid("q2"), "right", late),
            Err(AttemptError::AttemptExpired(_))
        ));

        let outcome = attempt.submit(late);
        assert!(outcome.forced);
        assert!((outcome.score - 50.0).abs() < f64::EPSILON);
        assert!(outcome.passed);
    }
}
