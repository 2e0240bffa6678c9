use chrono::{Duration, TimeZone, Utc};
use quiz_library::{
    parse_questions, score, AttemptPhase, AttemptService, CreateQuizRequest, Database, OptionIndex,
    QuizMode, QuizService, ReviewFilter,
};
use std::collections::BTreeMap;

const SAMPLE_FILE: &str = "Q: 2+2=?\nA) 3\nB) 4\nC) 5\nD) 6\nANS: 1\n\
                           Q: Capital of France?\nA) Paris\nB) Rome\nC) Oslo\nD) Bern\nANS: 0\n\
                           Q: Largest planet?\nA) Mars\nB) Venus\nC) Jupiter\nD) Earth\nANS: 2\n";

async fn create_services() -> (QuizService, AttemptService) {
    let db = Database::new("sqlite::memory:").await.unwrap();
    let quiz_service = QuizService::new(db);
    let attempt_service = AttemptService::new(quiz_service.clone(), 15);
    (quiz_service, attempt_service)
}

fn request(name: &str) -> CreateQuizRequest {
    CreateQuizRequest {
        test_name: name.to_string(),
        category: "Trivia".to_string(),
        description: None,
        file_content: SAMPLE_FILE.to_string(),
    }
}

fn opt(index: usize) -> OptionIndex {
    OptionIndex::new(index).unwrap()
}

#[test]
fn test_single_question_scenario() {
    let questions = parse_questions("Q: 2+2=?\nA) 3\nB) 4\nC) 5\nD) 6\nANS: 1");
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].question, "2+2=?");
    assert_eq!(questions[0].b.as_deref(), Some("4"));
    assert_eq!(questions[0].answer.as_deref(), Some("1"));

    let mut selections = BTreeMap::new();
    selections.insert(0, opt(1));
    let report = score(&questions, &selections);
    assert_eq!((report.correct, report.wrong, report.skipped, report.total), (1, 0, 0, 1));

    let report = score(&questions, &BTreeMap::new());
    assert_eq!((report.correct, report.wrong, report.skipped, report.total), (0, 0, 1, 1));
    assert_eq!(report.user_answers, vec![None]);
}

#[tokio::test]
async fn test_timed_attempt_end_to_end() {
    let (quizzes, attempts) = create_services().await;
    let quiz = quizzes.create_quiz(request("Timed")).await.unwrap();
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

    let view = attempts.start(quiz.id, QuizMode::Timed, t0).await.unwrap();

    // first question answered in time
    attempts.select(view.id, 0, opt(1), t0 + Duration::seconds(3)).await.unwrap();

    // nobody answers the second; the sweeper moves on at its deadline
    let stats = attempts.sweep_expired(t0 + Duration::seconds(18)).await.unwrap();
    assert_eq!(stats.timed_out, 1);

    let view = attempts.view(view.id, t0 + Duration::seconds(20)).await.unwrap();
    assert_eq!(view.current_question.as_ref().unwrap().question_index, 2);
    assert_eq!(view.seconds_remaining, Some(13));

    attempts.select(view.id, 2, opt(2), t0 + Duration::seconds(25)).await.unwrap();

    let view = attempts.view(view.id, t0 + Duration::seconds(26)).await.unwrap();
    assert_eq!(view.phase, AttemptPhase::Finished);
    let report = view.report.unwrap();
    assert_eq!((report.correct, report.wrong, report.skipped), (2, 0, 1));
    assert_eq!(report.time_taken, Some(25));

    let stored = quizzes.get_quiz(quiz.id).await.unwrap().unwrap();
    assert_eq!(stored.latest_score, Some(report));

    let review = quizzes.review_latest(quiz.id, ReviewFilter::Skipped).await.unwrap();
    assert_eq!(review.entries.len(), 1);
    assert_eq!(review.entries[0].question, "Capital of France?");
    assert_eq!(review.percentage, 67);
}

#[tokio::test]
async fn test_new_attempt_overwrites_latest_score() {
    let (quizzes, attempts) = create_services().await;
    let quiz = quizzes.create_quiz(request("Retake")).await.unwrap();
    let now = Utc::now();

    let first = attempts.start(quiz.id, QuizMode::Exam, now).await.unwrap();
    attempts.finish(first.id, now).await.unwrap();

    let second = attempts.start(quiz.id, QuizMode::Exam, now).await.unwrap();
    for (index, option) in [(0, 1), (1, 0), (2, 2)] {
        attempts.select(second.id, index, opt(option), now).await.unwrap();
    }
    attempts.finish(second.id, now).await.unwrap();

    let stored = quizzes.get_quiz(quiz.id).await.unwrap().unwrap();
    let latest = stored.latest_score.unwrap();
    assert_eq!(latest.correct, 3);
    assert_eq!(latest.percentage(), 100);
}

#[tokio::test]
async fn test_deleting_quiz_keeps_sections() {
    let (quizzes, _) = create_services().await;
    quizzes.create_section("Trivia").await.unwrap();
    let quiz = quizzes.create_quiz(request("Short lived")).await.unwrap();

    assert!(quizzes.delete_quiz(quiz.id).await.unwrap());
    assert!(!quizzes.delete_quiz(quiz.id).await.unwrap());
    assert!(quizzes.get_quizzes_by_category("Trivia").await.unwrap().is_empty());
    assert_eq!(quizzes.list_sections(None).await.unwrap().len(), 1);
}
