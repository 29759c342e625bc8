use std::sync::Arc;

use course_core::model::{Catalog, CourseId, LessonId, ModuleId, QuestionId, UserId};
use course_core::time::fixed_now;
use course_core::{AdvanceOutcome, Answers, LessonCursor};
use services::{AppServices, Clock, EnrollmentError, QuizSubmission};

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::from_json(include_str!("../../../data/catalog.json")).expect("catalog"))
}

fn mid(id: &str) -> ModuleId {
    ModuleId::new(id).unwrap()
}

fn all_correct(catalog: &Catalog, module: &str) -> Answers {
    catalog
        .course(&CourseId::new("revops").unwrap())
        .unwrap()
        .assessment_for(&mid(module))
        .unwrap()
        .questions()
        .iter()
        .map(|q| (q.id.clone(), q.correct_answer.clone()))
        .collect()
}

#[tokio::test]
async fn learner_walks_the_sample_course_to_a_certificate() {
    let catalog = catalog();
    let app = AppServices::new_sqlite(
        "sqlite:file:memdb_course_flow?mode=memory&cache=shared",
        Clock::fixed(fixed_now()),
        Arc::clone(&catalog),
    )
    .await
    .expect("sqlite services");
    let user = UserId::new("learner-1").unwrap();
    let revops = CourseId::new("revops").unwrap();

    app.enrollments()
        .enroll(&user, Some("Ada".into()), "revops", None)
        .await
        .unwrap();

    let learning = app.learning();

    // Module 1: three content lessons, then the quiz.
    let mut cursor = LessonCursor::start_of(mid("module-1"));
    for _ in 0..3 {
        cursor = learning.advance(&user, &revops, &cursor).await.unwrap().cursor;
    }
    assert_eq!(cursor, LessonCursor::new(mid("module-1"), 3));
    let err = learning.advance(&user, &revops, &cursor).await.unwrap_err();
    assert!(matches!(err, EnrollmentError::Progress(_)));

    let failed = learning
        .submit_quiz(
            &user,
            &revops,
            QuizSubmission {
                module_id: mid("module-1"),
                answers: Answers::new(),
                lesson_index: None,
                started_at: None,
            },
        )
        .await
        .unwrap();
    assert!(!failed.outcome.passed);

    let passed = learning
        .submit_quiz(
            &user,
            &revops,
            QuizSubmission {
                module_id: mid("module-1"),
                answers: all_correct(&catalog, "module-1"),
                lesson_index: Some(3),
                started_at: None,
            },
        )
        .await
        .unwrap();
    let step = passed.advance.expect("pass advances");
    assert_eq!(
        step.outcome,
        AdvanceOutcome::ModuleCompleted {
            next_module: mid("module-2")
        }
    );

    // Module 2 through the direct completion path, then its quiz.
    for lesson in ["lesson-2-1", "lesson-2-2", "lesson-2-3", "lesson-2-4"] {
        learning
            .complete_lesson(&user, &revops, &LessonId::new(lesson).unwrap())
            .await
            .unwrap();
    }
    let mut answers = all_correct(&catalog, "module-2");
    answers.insert(QuestionId::new("q5").unwrap(), "wrong".into());
    let passed = learning
        .submit_quiz(
            &user,
            &revops,
            QuizSubmission {
                module_id: mid("module-2"),
                answers,
                lesson_index: None,
                started_at: None,
            },
        )
        .await
        .unwrap();
    assert!((passed.outcome.score - 80.0).abs() < f64::EPSILON);
    assert!(passed.outcome.passed);

    let certificate = learning.course_completion(&user, &revops).await.unwrap();
    assert!(!certificate.eligible);

    // Module 3 has no quiz.
    let step = learning
        .advance(&user, &revops, &LessonCursor::start_of(mid("module-3")))
        .await
        .unwrap();
    let step = learning.advance(&user, &revops, &step.cursor).await.unwrap();
    assert_eq!(step.outcome, AdvanceOutcome::CourseCompleted);

    let overview = app.enrollments().overview(&user, &revops).await.unwrap();
    assert!(overview.course_complete);
    assert!((overview.completion_percent - 100.0).abs() < f64::EPSILON);

    let certificate = learning.course_completion(&user, &revops).await.unwrap();
    assert!(certificate.eligible);
    assert_eq!(certificate.completed_at, Some(fixed_now()));

    let progress = app.enrollments().get_progress(&user, &revops).await.unwrap();
    assert_eq!(progress.completed_modules, 3);
    assert!((progress.score - 80.0).abs() < f64::EPSILON);
}
