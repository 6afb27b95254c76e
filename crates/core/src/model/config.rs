use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("question count must be > 0")]
    ZeroQuestions,

    #[error("time limit must be > 0 seconds")]
    ZeroTimeLimit,

    #[error("passing score must be between 0 and 100, got {0}")]
    InvalidPassingScore(u8),

    #[error("expected {expected} questions, got {actual}")]
    QuestionCountMismatch { expected: u32, actual: usize },
}

//
// ─── RESPONSE TIMING ───────────────────────────────────────────────────────────
//

/// How `response_ms` is charged on each reported outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseTiming {
    /// Time the learner spent viewing each question.
    #[default]
    PerQuestion,
    /// Whole-session elapsed time charged to every question.
    WholeSession,
}

//
// ─── SESSION CONFIG ────────────────────────────────────────────────────────────
//

/// Per-attempt configuration, fixed once a session starts.
///
/// The Timed Quiz and the Mock Exam are the same engine with different configs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    question_count: u32,
    time_limit_secs: u32,
    allow_flagging: bool,
    allow_free_navigation: bool,
    passing_score_percent: u8,
    response_timing: ResponseTiming,
}

impl SessionConfig {
    /// Pass mark used by both the quiz and mock exam flows.
    pub const DEFAULT_PASSING_SCORE: u8 = 65;
    pub const QUIZ_LENGTH: u32 = 15;
    pub const QUIZ_TIME_LIMIT_SECS: u32 = 15 * 60;

    /// Creates a validated session configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the question count or time limit is zero, or
    /// the passing score exceeds 100.
    pub fn new(
        question_count: u32,
        time_limit_secs: u32,
        allow_flagging: bool,
        allow_free_navigation: bool,
        passing_score_percent: u8,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            question_count,
            time_limit_secs,
            allow_flagging,
            allow_free_navigation,
            passing_score_percent,
            response_timing: ResponseTiming::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Fixed-length timed quiz: 15 questions in 15 minutes, linear navigation.
    #[must_use]
    pub fn timed_quiz() -> Self {
        Self {
            question_count: Self::QUIZ_LENGTH,
            time_limit_secs: Self::QUIZ_TIME_LIMIT_SECS,
            allow_flagging: false,
            allow_free_navigation: false,
            passing_score_percent: Self::DEFAULT_PASSING_SCORE,
            response_timing: ResponseTiming::WholeSession,
        }
    }

    /// Mock exam with flagging and free navigation.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `question_count` or `time_limit_minutes` is zero.
    pub fn mock_exam(question_count: u32, time_limit_minutes: u32) -> Result<Self, ConfigError> {
        Self::new(
            question_count,
            time_limit_minutes.saturating_mul(60),
            true,
            true,
            Self::DEFAULT_PASSING_SCORE,
        )
    }

    #[must_use]
    pub fn with_response_timing(mut self, timing: ResponseTiming) -> Self {
        self.response_timing = timing;
        self
    }

    /// Re-check the invariants; configs can also arrive through serde.
    ///
    /// # Errors
    ///
    /// Returns the first violated `ConfigError`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.question_count == 0 {
            return Err(ConfigError::ZeroQuestions);
        }
        if self.time_limit_secs == 0 {
            return Err(ConfigError::ZeroTimeLimit);
        }
        if self.passing_score_percent > 100 {
            return Err(ConfigError::InvalidPassingScore(self.passing_score_percent));
        }
        Ok(())
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    #[must_use]
    pub fn allow_flagging(&self) -> bool {
        self.allow_flagging
    }

    #[must_use]
    pub fn allow_free_navigation(&self) -> bool {
        self.allow_free_navigation
    }

    #[must_use]
    pub fn passing_score_percent(&self) -> u8 {
        self.passing_score_percent
    }

    #[must_use]
    pub fn response_timing(&self) -> ResponseTiming {
        self.response_timing
    }
}
