use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;

use exam_core::model::{AnswerBatch, SessionConfig, SessionPhase, SubjectId, UserId};
use exam_core::time::manual_clock;
use services::{Completion, ExamService, ReportStatus, SessionError, SessionEvent};
use storage::SeededQuestionGenerator;
use storage::repository::{InMemoryRepository, ResultReporter, StorageError};

const SUBJECT: SubjectId = SubjectId::new(1);

fn repo_with(count: u32) -> InMemoryRepository {
    let questions = SeededQuestionGenerator::new(11)
        .generate(SUBJECT, "Science", count)
        .unwrap();
    InMemoryRepository::with_questions(questions)
}

fn config(count: u32, secs: u32) -> SessionConfig {
    SessionConfig::new(count, secs, true, true, 65).unwrap()
}

fn service(
    repo: &InMemoryRepository,
    reporter: Arc<dyn ResultReporter>,
    user: Option<UserId>,
) -> ExamService {
    ExamService::new(manual_clock(), Arc::new(repo.clone()))
        .with_reporter(reporter)
        .with_user(user)
}

/// Drain events until completion, counting ticks and warnings on the way.
async fn until_completed(
    rx: &mut UnboundedReceiver<SessionEvent>,
) -> (Completion, ReportStatus, usize, usize) {
    let mut ticks = 0;
    let mut warnings = 0;
    loop {
        match rx.recv().await.expect("event stream closed") {
            SessionEvent::Tick { .. } => ticks += 1,
            SessionEvent::TimeWarning { .. } => warnings += 1,
            SessionEvent::Completed { completion, report } => {
                return (completion, report.status().await, ticks, warnings);
            }
        }
    }
}

#[derive(Default)]
struct CountingReporter {
    calls: AtomicUsize,
}

#[async_trait]
impl ResultReporter for CountingReporter {
    async fn submit(&self, _batch: &AnswerBatch) -> Result<(), StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingReporter;

#[async_trait]
impl ResultReporter for FailingReporter {
    async fn submit(&self, _batch: &AnswerBatch) -> Result<(), StorageError> {
        Err(StorageError::Connection("sink offline".into()))
    }
}

#[tokio::test(start_paused = true)]
async fn untouched_session_times_out_with_everything_skipped() {
    let repo = repo_with(3);
    let svc = service(&repo, Arc::new(repo.clone()), Some(UserId::random()));
    let (session, mut rx) = svc.start(SUBJECT, config(3, 10)).await.unwrap();

    let (completion, status, ticks, warnings) = until_completed(&mut rx).await;

    assert_eq!(ticks, 10);
    assert_eq!(warnings, 0);
    assert!(completion.forced);
    assert_eq!(completion.result.skipped_count(), 3);
    assert_eq!(completion.result.elapsed_secs(), 10);
    assert_eq!(session.phase(), SessionPhase::Completed);
    assert_eq!(session.remaining_secs(), 0);
    assert_eq!(status, ReportStatus::Submitted { records: 3 });

    let batches = repo.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].result.as_ref(), Some(&completion.result));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn double_finish_reports_once() {
    let repo = repo_with(2);
    let reporter = Arc::new(CountingReporter::default());
    let svc = service(&repo, reporter.clone(), Some(UserId::random()));
    let (session, mut rx) = svc.start(SUBJECT, config(2, 60)).await.unwrap();

    session.select_answer(1).unwrap();
    assert!(session.finish().is_some());
    assert!(session.finish().is_none());

    let (completion, status, _, _) = until_completed(&mut rx).await;
    assert!(!completion.forced);
    assert_eq!(status, ReportStatus::Submitted { records: 2 });

    tokio::time::sleep(Duration::from_secs(90)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(reporter.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn failing_reporter_keeps_result() {
    let repo = repo_with(2);
    let svc = service(&repo, Arc::new(FailingReporter), Some(UserId::random()));
    let (session, mut rx) = svc.start(SUBJECT, config(2, 60)).await.unwrap();

    session.select_answer(0).unwrap();
    let finished = session.finish().unwrap();

    let (_, status, _, _) = until_completed(&mut rx).await;
    let ReportStatus::Failed { reason } = status else {
        panic!("expected failed report, got {status:?}");
    };
    assert!(reason.contains("sink offline"));
    assert_eq!(session.result(), Some(finished.result));
}

#[tokio::test(start_paused = true)]
async fn anonymous_session_skips_reporting() {
    let repo = repo_with(2);
    let svc = service(&repo, Arc::new(repo.clone()), None);
    let (session, mut rx) = svc.start(SUBJECT, config(2, 60)).await.unwrap();

    session.finish().unwrap();
    let (_, status, _, _) = until_completed(&mut rx).await;

    assert_eq!(status, ReportStatus::Skipped);
    assert!(repo.batches().is_empty());
}

#[tokio::test(start_paused = true)]
async fn exit_stops_the_countdown() {
    let repo = repo_with(2);
    let svc = service(&repo, Arc::new(repo.clone()), Some(UserId::random()));
    let (session, mut rx) = svc.start(SUBJECT, config(2, 5)).await.unwrap();

    assert!(matches!(rx.recv().await, Some(SessionEvent::Tick { remaining_secs: 4 })));
    session.exit();

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(session.phase(), SessionPhase::NotStarted);
    assert!(session.result().is_none());
    assert!(repo.batches().is_empty());
}

#[tokio::test(start_paused = true)]
async fn low_time_warning_fires_once() {
    let repo = repo_with(1);
    let svc = service(&repo, Arc::new(repo.clone()), None);
    let (_session, mut rx) = svc.start(SUBJECT, config(1, 303)).await.unwrap();

    let (completion, _, ticks, warnings) = until_completed(&mut rx).await;
    assert_eq!(ticks, 303);
    assert_eq!(warnings, 1);
    assert!(completion.forced);
}

#[tokio::test(start_paused = true)]
async fn restart_runs_a_fresh_generation() {
    let repo = repo_with(2);
    let svc = service(&repo, Arc::new(repo.clone()), None);
    let (session, mut rx) = svc.start(SUBJECT, config(2, 30)).await.unwrap();

    assert!(!svc.restart(&session, config(2, 30)).await.unwrap());
    session.select_answer(1).unwrap();
    session.finish().unwrap();
    let _ = until_completed(&mut rx).await;

    assert!(svc.restart(&session, config(2, 20)).await.unwrap());
    assert_eq!(session.generation(), 2);
    assert_eq!(session.answers(), vec![None, None]);
    assert!(session.result().is_none());

    assert!(matches!(rx.recv().await, Some(SessionEvent::Tick { remaining_secs: 19 })));
}

#[tokio::test(start_paused = true)]
async fn restart_while_active_keeps_a_single_countdown() {
    let repo = repo_with(2);
    let svc = service(&repo, Arc::new(repo.clone()), None);
    let (session, mut rx) = svc.start(SUBJECT, config(2, 30)).await.unwrap();

    assert!(!svc.restart(&session, config(2, 30)).await.unwrap());
    assert!(!svc.restart(&session, config(2, 30)).await.unwrap());
    assert_eq!(session.generation(), 1);

    for expected in (25..30).rev() {
        let Some(SessionEvent::Tick { remaining_secs }) = rx.recv().await else {
            panic!("expected a tick");
        };
        assert_eq!(remaining_secs, expected);
    }
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(session.remaining_secs(), 25);
    session.exit();
}

#[tokio::test]
async fn short_source_cannot_start() {
    let repo = repo_with(2);
    let svc = service(&repo, Arc::new(repo.clone()), None);

    let err = svc.start(SUBJECT, config(3, 60)).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::InsufficientQuestions { requested: 3, available: 2 }
    ));
}

#[tokio::test]
async fn longer_source_is_truncated() {
    let repo = repo_with(5);
    let svc = service(&repo, Arc::new(repo.clone()), None);

    let (session, _rx) = svc.start(SUBJECT, config(3, 60)).await.unwrap();
    assert_eq!(session.progress().total, 3);
    session.exit();
}

#[tokio::test(start_paused = true)]
async fn jump_out_of_range_keeps_position() {
    let repo = repo_with(4);
    let svc = service(&repo, Arc::new(repo.clone()), None);
    let (session, _rx) = svc.start(SUBJECT, config(4, 60)).await.unwrap();

    session.jump_to(2).unwrap();
    let err = session.jump_to(4).unwrap_err();
    assert!(matches!(err, SessionError::IndexOutOfRange { index: 4, len: 4 }));
    assert_eq!(session.current_index(), 2);
}
