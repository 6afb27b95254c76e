use async_trait::async_trait;
use exam_core::model::{AnswerBatch, Question, QuestionId, SubjectId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Ordered question supply for fixed-length sessions.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch up to `count` questions for a subject, in presentation order.
    ///
    /// Returning fewer than `count` is not an error here; the session layer
    /// decides what a short result means.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn fetch_questions(
        &self,
        subject_id: SubjectId,
        count: u32,
    ) -> Result<Vec<Question>, StorageError>;
}

/// Opaque adaptive selector handing out one question at a time.
#[async_trait]
pub trait AdaptiveQuestionSource: Send + Sync {
    /// Pick the next question for a subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the subject has no questions, or
    /// other storage errors.
    async fn fetch_next(&self, subject_id: SubjectId) -> Result<Question, StorageError>;
}

/// Sink for per-answer events and aggregate results.
#[async_trait]
pub trait ResultReporter: Send + Sync {
    /// Persist one batch. Called at most once per completed session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch could not be stored.
    async fn submit(&self, batch: &AnswerBatch) -> Result<(), StorageError>;
}

/// Write side of the question bank, used for seeding.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or replace a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Number of questions stored for a subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn count_questions(&self, subject_id: SubjectId) -> Result<u32, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Questions are served in id order. The adaptive source cycles through a
/// subject's questions so repeated calls are deterministic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<BTreeMap<QuestionId, Question>>>,
    cursors: Arc<Mutex<HashMap<SubjectId, usize>>>,
    batches: Arc<Mutex<Vec<AnswerBatch>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository pre-filled with `questions`.
    #[must_use]
    pub fn with_questions(questions: impl IntoIterator<Item = Question>) -> Self {
        let repo = Self::new();
        if let Ok(mut guard) = repo.questions.lock() {
            guard.extend(questions.into_iter().map(|q| (q.id(), q)));
        }
        repo
    }

    /// Snapshot of every batch submitted so far.
    #[must_use]
    pub fn batches(&self) -> Vec<AnswerBatch> {
        self.batches
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn subject_questions(&self, subject_id: SubjectId) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .values()
            .filter(|q| q.subject_id() == subject_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QuestionSource for InMemoryRepository {
    async fn fetch_questions(
        &self,
        subject_id: SubjectId,
        count: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let limit = usize::try_from(count).unwrap_or(usize::MAX);
        let mut questions = self.subject_questions(subject_id)?;
        questions.truncate(limit);
        Ok(questions)
    }
}

#[async_trait]
impl AdaptiveQuestionSource for InMemoryRepository {
    async fn fetch_next(&self, subject_id: SubjectId) -> Result<Question, StorageError> {
        let questions = self.subject_questions(subject_id)?;
        if questions.is_empty() {
            return Err(StorageError::NotFound);
        }
        let mut cursors = self
            .cursors
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let cursor = cursors.entry(subject_id).or_insert(0);
        let question = questions[*cursor % questions.len()].clone();
        *cursor = cursor.wrapping_add(1);
        Ok(question)
    }
}

#[async_trait]
impl ResultReporter for InMemoryRepository {
    async fn submit(&self, batch: &AnswerBatch) -> Result<(), StorageError> {
        let mut guard = self
            .batches
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(batch.clone());
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(question.id(), question.clone());
        Ok(())
    }

    async fn count_questions(&self, subject_id: SubjectId) -> Result<u32, StorageError> {
        let len = self.subject_questions(subject_id)?.len();
        u32::try_from(len)
            .map_err(|_| StorageError::Serialization("question count overflow".into()))
    }
}

/// Aggregates the collaborator contracts behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub source: Arc<dyn QuestionSource>,
    pub adaptive: Arc<dyn AdaptiveQuestionSource>,
    pub reporter: Arc<dyn ResultReporter>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(InMemoryRepository::new())
    }

    /// Wrap an existing in-memory repository, keeping a handle for inspection.
    #[must_use]
    pub fn from_in_memory(repo: InMemoryRepository) -> Self {
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let source: Arc<dyn QuestionSource> = Arc::new(repo.clone());
        let adaptive: Arc<dyn AdaptiveQuestionSource> = Arc::new(repo.clone());
        let reporter: Arc<dyn ResultReporter> = Arc::new(repo);
        Self {
            questions,
            source,
            adaptive,
            reporter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Choice, UserId};
    use exam_core::time::fixed_now;

    fn build_question(id: u64, subject: u64) -> Question {
        let choices = vec![Choice::new("A", "yes"), Choice::new("B", "no")];
        Question::new(
            QuestionId::new(id),
            SubjectId::new(subject),
            format!("Q{id}"),
            choices,
            0,
            1,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_questions_filters_by_subject_and_limits() {
        let repo = InMemoryRepository::with_questions([
            build_question(3, 1),
            build_question(1, 1),
            build_question(2, 2),
            build_question(4, 1),
        ]);

        let fetched = repo.fetch_questions(SubjectId::new(1), 2).await.unwrap();
        let ids: Vec<_> = fetched.iter().map(Question::id).collect();
        assert_eq!(ids, vec![QuestionId::new(1), QuestionId::new(3)]);
    }

    #[tokio::test]
    async fn adaptive_source_cycles_and_reports_missing_subject() {
        let repo = InMemoryRepository::with_questions([build_question(1, 1), build_question(2, 1)]);

        let first = repo.fetch_next(SubjectId::new(1)).await.unwrap();
        let second = repo.fetch_next(SubjectId::new(1)).await.unwrap();
        let third = repo.fetch_next(SubjectId::new(1)).await.unwrap();
        assert_eq!(first.id(), QuestionId::new(1));
        assert_eq!(second.id(), QuestionId::new(2));
        assert_eq!(third.id(), QuestionId::new(1));

        let err = repo.fetch_next(SubjectId::new(9)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn reporter_records_batches() {
        let repo = InMemoryRepository::new();
        let batch = AnswerBatch {
            user_id: UserId::random(),
            subject_id: SubjectId::new(1),
            started_at: fixed_now(),
            finished_at: fixed_now(),
            result: None,
            outcomes: Vec::new(),
        };
        repo.submit(&batch).await.unwrap();
        assert_eq!(repo.batches(), vec![batch]);
    }

    #[tokio::test]
    async fn upsert_replaces_and_counts() {
        let repo = InMemoryRepository::new();
        repo.upsert_question(&build_question(1, 5)).await.unwrap();
        repo.upsert_question(&build_question(1, 5)).await.unwrap();
        repo.upsert_question(&build_question(2, 5)).await.unwrap();
        assert_eq!(repo.count_questions(SubjectId::new(5)).await.unwrap(), 2);
    }
}
