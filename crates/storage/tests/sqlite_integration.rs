use chrono::Duration;
use exam_core::model::{AnswerBatch, OutcomeRecord, QuestionId, SessionConfig, SubjectId, UserId};
use exam_core::scorer;
use exam_core::time::fixed_now;
use storage::repository::{
    AdaptiveQuestionSource, QuestionRepository, QuestionSource, ResultReporter,
};
use storage::sqlite::SqliteRepository;
use storage::{SeededQuestionGenerator, subject_start_id};

async fn seeded_repo(name: &str, count: u32) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");

    let questions = SeededQuestionGenerator::new(11)
        .generate(SubjectId::new(1), "Science", count)
        .unwrap();
    for q in &questions {
        repo.upsert_question(q).await.unwrap();
    }
    repo
}

#[tokio::test]
async fn sqlite_roundtrips_questions_in_order() {
    let repo = seeded_repo("memdb_questions", 5).await;

    let fetched = repo.fetch_questions(SubjectId::new(1), 3).await.unwrap();
    let ids: Vec<_> = fetched.iter().map(|q| q.id()).collect();
    assert_eq!(ids, vec![QuestionId::new(1), QuestionId::new(2), QuestionId::new(3)]);

    let expected = SeededQuestionGenerator::new(11)
        .generate(SubjectId::new(1), "Science", 5)
        .unwrap();
    assert_eq!(fetched[0], expected[0]);
    assert_eq!(repo.count_questions(SubjectId::new(1)).await.unwrap(), 5);
    assert!(repo.fetch_questions(SubjectId::new(2), 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_persists_result_and_events() {
    let repo = seeded_repo("memdb_results", 4).await;
    let questions = repo.fetch_questions(SubjectId::new(1), 4).await.unwrap();
    let config = SessionConfig::new(4, 600, true, true, 65).unwrap();

    let answers: Vec<Option<usize>> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| if i == 0 { Some(q.correct_choice()) } else { None })
        .collect();
    let result = scorer::score(&questions, &answers, &config, 300);
    let outcomes = scorer::outcomes(&questions, &answers, &[1_000, 2_000, 3_000, 4_000]);

    let user = UserId::random();
    let batch = AnswerBatch {
        user_id: user,
        subject_id: SubjectId::new(1),
        started_at: fixed_now(),
        finished_at: fixed_now() + Duration::seconds(300),
        result: Some(result.clone()),
        outcomes,
    };
    repo.submit(&batch).await.unwrap();

    let rows = repo.recent_results(user, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].result, result);
    assert_eq!(rows[0].result.elapsed_secs(), 300);
    assert_eq!(rows[0].finished_at, batch.finished_at);
    assert_eq!(repo.answer_event_count(user).await.unwrap(), 4);
    assert!(repo.recent_results(UserId::random(), 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_adaptive_prefers_least_answered() {
    let repo = seeded_repo("memdb_adaptive", 3).await;

    let first = repo.fetch_next(SubjectId::new(1)).await.unwrap();
    assert_eq!(first.id(), QuestionId::new(1));

    let batch = AnswerBatch {
        user_id: UserId::random(),
        subject_id: SubjectId::new(1),
        started_at: fixed_now(),
        finished_at: fixed_now(),
        result: None,
        outcomes: vec![OutcomeRecord {
            question_id: first.id(),
            selected_choice: Some(0),
            is_correct: first.is_correct(0),
            response_ms: 800,
        }],
    };
    repo.submit(&batch).await.unwrap();

    let next = repo.fetch_next(SubjectId::new(1)).await.unwrap();
    assert_eq!(next.id(), QuestionId::new(2));

    let err = repo.fetch_next(SubjectId::new(99)).await.unwrap_err();
    assert!(matches!(err, storage::StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_seeding_second_subject_keeps_first() {
    let url = "sqlite:file:memdb_two_subjects?mode=memory&cache=shared";
    let repo = SqliteRepository::connect(url).await.expect("connect");
    repo.migrate().await.expect("migrate");

    for (subject, topic) in [(SubjectId::new(1), "Math"), (SubjectId::new(2), "Science")] {
        let start = subject_start_id(subject, 0, 10).unwrap();
        let questions = SeededQuestionGenerator::new(42)
            .starting_at(start)
            .generate(subject, topic, 10)
            .unwrap();
        for q in &questions {
            repo.upsert_question(q).await.unwrap();
        }
    }

    assert_eq!(repo.count_questions(SubjectId::new(1)).await.unwrap(), 10);
    assert_eq!(repo.count_questions(SubjectId::new(2)).await.unwrap(), 10);
    let first = repo.fetch_questions(SubjectId::new(1), 1).await.unwrap();
    assert_eq!(first[0].id(), QuestionId::new(10_001));
}
