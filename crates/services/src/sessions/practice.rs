use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use exam_core::model::{OutcomeRecord, Question, QuestionId, SubjectId, UserId};
use exam_core::{Clock, scorer};
use storage::repository::{AdaptiveQuestionSource, ResultReporter, StorageError};

use crate::error::SessionError;
use crate::reporting::{ReportDispatcher, ReportTicket};

/// Running tally for an untimed practice run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PracticeStats {
    pub answered: u32,
    pub correct: u32,
}

impl PracticeStats {
    #[must_use]
    pub fn accuracy_percent(&self) -> u8 {
        scorer::score_percent(self.correct, self.answered)
    }
}

/// Immediate feedback for one submitted practice answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PracticeFeedback {
    pub question_id: QuestionId,
    pub selected_choice: usize,
    pub correct_choice: usize,
    pub is_correct: bool,
    pub response_ms: u64,
}

/// Feedback plus the in-flight report for a submitted answer.
#[derive(Debug)]
pub struct PracticeSubmission {
    pub feedback: PracticeFeedback,
    pub report: ReportTicket,
}

/// Opens practice runs against the adaptive selector.
#[derive(Clone)]
pub struct PracticeService {
    clock: Clock,
    source: Arc<dyn AdaptiveQuestionSource>,
    reporter: Option<Arc<dyn ResultReporter>>,
    user_id: Option<UserId>,
}

impl PracticeService {
    #[must_use]
    pub fn new(clock: Clock, source: Arc<dyn AdaptiveQuestionSource>) -> Self {
        Self {
            clock,
            source,
            reporter: None,
            user_id: None,
        }
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn ResultReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    #[must_use]
    pub fn with_user(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Open a practice run for `subject_id`. No question is loaded yet.
    #[must_use]
    pub fn session(&self, subject_id: SubjectId) -> PracticeSession {
        PracticeSession {
            clock: self.clock.clone(),
            source: Arc::clone(&self.source),
            dispatcher: ReportDispatcher::new(self.reporter.clone(), self.user_id, subject_id),
            subject_id,
            current: None,
            presented_at: None,
            selected: None,
            feedback: None,
            stats: PracticeStats::default(),
        }
    }
}

impl fmt::Debug for PracticeService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeService")
            .field("has_reporter", &self.reporter.is_some())
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Untimed one-question-at-a-time practice with immediate feedback.
///
/// Each submitted answer is reported on its own; there is no aggregate result.
pub struct PracticeSession {
    clock: Clock,
    source: Arc<dyn AdaptiveQuestionSource>,
    dispatcher: ReportDispatcher,
    subject_id: SubjectId,
    current: Option<Question>,
    presented_at: Option<DateTime<Utc>>,
    selected: Option<usize>,
    feedback: Option<PracticeFeedback>,
    stats: PracticeStats,
}

impl PracticeSession {
    /// Ask the adaptive selector for the next question, discarding any
    /// unsubmitted selection on the current one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InsufficientQuestions` if the subject has no
    /// questions, or `SessionError::Source` for other storage failures.
    pub async fn next_question(&mut self) -> Result<&Question, SessionError> {
        let question = match self.source.fetch_next(self.subject_id).await {
            Ok(question) => question,
            Err(StorageError::NotFound) => {
                return Err(SessionError::InsufficientQuestions {
                    requested: 1,
                    available: 0,
                });
            }
            Err(err) => return Err(err.into()),
        };
        debug!(
            subject_id = %self.subject_id,
            question_id = %question.id(),
            "practice question loaded"
        );

        self.presented_at = Some(self.clock.now());
        self.selected = None;
        self.feedback = None;
        Ok(&*self.current.insert(question))
    }

    /// Choose an answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestion`, `SessionError::AnswerLocked` once
    /// submitted, or `SessionError::InvalidChoice`.
    pub fn select(&mut self, choice: usize) -> Result<(), SessionError> {
        let question = self.current.as_ref().ok_or(SessionError::NoQuestion)?;
        if self.feedback.is_some() {
            return Err(SessionError::AnswerLocked);
        }
        if !question.has_choice(choice) {
            return Err(SessionError::InvalidChoice {
                index: choice,
                available: question.choice_count(),
            });
        }
        self.selected = Some(choice);
        Ok(())
    }

    /// Lock in the selected answer, update the tally and report it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestion`, `SessionError::AnswerLocked` on a
    /// second submit, or `SessionError::NoSelection`.
    pub fn submit(&mut self) -> Result<PracticeSubmission, SessionError> {
        let question = self.current.as_ref().ok_or(SessionError::NoQuestion)?;
        if self.feedback.is_some() {
            return Err(SessionError::AnswerLocked);
        }
        let selected = self.selected.ok_or(SessionError::NoSelection)?;

        let now = self.clock.now();
        let presented_at = self.presented_at.unwrap_or(now);
        let response_ms = self.clock.millis_since(presented_at);
        let is_correct = question.is_correct(selected);

        let feedback = PracticeFeedback {
            question_id: question.id(),
            selected_choice: selected,
            correct_choice: question.correct_choice(),
            is_correct,
            response_ms,
        };
        let outcome = OutcomeRecord {
            question_id: question.id(),
            selected_choice: Some(selected),
            is_correct,
            response_ms,
        };

        self.stats.answered = self.stats.answered.saturating_add(1);
        if is_correct {
            self.stats.correct = self.stats.correct.saturating_add(1);
        }
        self.feedback = Some(feedback.clone());

        let report = self.dispatcher.dispatch(presented_at, now, None, vec![outcome]);
        Ok(PracticeSubmission { feedback, report })
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn feedback(&self) -> Option<&PracticeFeedback> {
        self.feedback.as_ref()
    }

    #[must_use]
    pub fn stats(&self) -> PracticeStats {
        self.stats
    }
}

impl fmt::Debug for PracticeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticeSession")
            .field("subject_id", &self.subject_id)
            .field("current", &self.current.as_ref().map(Question::id))
            .field("selected", &self.selected)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
