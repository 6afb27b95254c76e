use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{QuestionId, SubjectId, UserId};
use crate::scorer::score_percent;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamResultError {
    #[error("a result needs at least one question")]
    Empty,

    #[error("total questions ({total}) does not match outcome counts ({sum})")]
    CountMismatch { total: u32, sum: u32 },

    #[error("passing score must be between 0 and 100, got {0}")]
    InvalidPassingScore(u8),
}

/// Coarse lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    NotStarted,
    Loading,
    Active,
    Completed,
}

impl SessionPhase {
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, SessionPhase::Active)
    }

    /// Phases from which a fresh session may be started.
    #[must_use]
    pub fn can_start(self) -> bool {
        !self.is_active()
    }
}

//
// ─── RESULT ────────────────────────────────────────────────────────────────────
//

/// Aggregate outcome of a completed session. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResult {
    total_questions: u32,
    correct_count: u32,
    incorrect_count: u32,
    skipped_count: u32,
    elapsed_secs: u32,
    score_percent: u8,
    passing_score_percent: u8,
    passed: bool,
}

impl ExamResult {
    pub(crate) fn tally(
        correct_count: u32,
        incorrect_count: u32,
        skipped_count: u32,
        elapsed_secs: u32,
        passing_score_percent: u8,
    ) -> Self {
        let total_questions = correct_count + incorrect_count + skipped_count;
        let score_percent = score_percent(correct_count, total_questions);
        Self {
            total_questions,
            correct_count,
            incorrect_count,
            skipped_count,
            elapsed_secs,
            score_percent,
            passing_score_percent,
            passed: score_percent >= passing_score_percent,
        }
    }

    /// Rehydrate a result from persisted counts.
    ///
    /// The score and pass flag are recomputed, never trusted from storage.
    ///
    /// # Errors
    ///
    /// Returns `ExamResultError` if the counts do not add up or the pass mark
    /// is out of range.
    pub fn from_persisted(
        total_questions: u32,
        correct_count: u32,
        incorrect_count: u32,
        skipped_count: u32,
        elapsed_secs: u32,
        passing_score_percent: u8,
    ) -> Result<Self, ExamResultError> {
        if total_questions == 0 {
            return Err(ExamResultError::Empty);
        }
        let sum = correct_count
            .saturating_add(incorrect_count)
            .saturating_add(skipped_count);
        if sum != total_questions {
            return Err(ExamResultError::CountMismatch {
                total: total_questions,
                sum,
            });
        }
        if passing_score_percent > 100 {
            return Err(ExamResultError::InvalidPassingScore(passing_score_percent));
        }
        Ok(Self::tally(
            correct_count,
            incorrect_count,
            skipped_count,
            elapsed_secs,
            passing_score_percent,
        ))
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn incorrect_count(&self) -> u32 {
        self.incorrect_count
    }

    #[must_use]
    pub fn skipped_count(&self) -> u32 {
        self.skipped_count
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    #[must_use]
    pub fn score_percent(&self) -> u8 {
        self.score_percent
    }

    #[must_use]
    pub fn passing_score_percent(&self) -> u8 {
        self.passing_score_percent
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.passed
    }
}

//
// ─── REPORTING RECORDS ─────────────────────────────────────────────────────────
//

/// Per-question outcome handed to the result sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub question_id: QuestionId,
    pub selected_choice: Option<usize>,
    pub is_correct: bool,
    pub response_ms: u64,
}

/// One submission to the result sink: a whole session, or a single practice answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerBatch {
    pub user_id: UserId,
    pub subject_id: SubjectId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub result: Option<ExamResult>,
    pub outcomes: Vec<OutcomeRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_result_recomputes_score() {
        let result = ExamResult::from_persisted(4, 2, 1, 1, 120, 65).unwrap();
        assert_eq!(result.score_percent(), 50);
        assert!(!result.passed());
        assert_eq!(result.elapsed_secs(), 120);
    }

    #[test]
    fn persisted_result_rejects_bad_counts() {
        let err = ExamResult::from_persisted(5, 2, 1, 1, 0, 65).unwrap_err();
        assert_eq!(err, ExamResultError::CountMismatch { total: 5, sum: 4 });
        assert_eq!(
            ExamResult::from_persisted(0, 0, 0, 0, 0, 65).unwrap_err(),
            ExamResultError::Empty
        );
    }

    #[test]
    fn only_active_phase_blocks_start() {
        assert!(SessionPhase::NotStarted.can_start());
        assert!(SessionPhase::Loading.can_start());
        assert!(SessionPhase::Completed.can_start());
        assert!(!SessionPhase::Active.can_start());
    }
}
