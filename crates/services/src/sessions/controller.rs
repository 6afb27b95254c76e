use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use exam_core::model::{
    ConfigError, ExamResult, OutcomeRecord, Question, ResponseTiming, SessionConfig, SessionPhase,
};
use exam_core::{Clock, scorer};

use super::progress::{QuestionStatus, SessionProgress};
use crate::error::SessionError;

/// Remaining time at which the one-shot low-time warning fires.
pub const WARNING_THRESHOLD_SECS: u32 = 5 * 60;

//
// ─── TRANSITION OUTCOMES ───────────────────────────────────────────────────────
//

/// Everything produced by the single transition into `Completed`.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub generation: u64,
    pub result: ExamResult,
    pub outcomes: Vec<OutcomeRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// `true` when the countdown reached zero, `false` for a learner finish.
    pub forced: bool,
}

/// What a countdown tick did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The tick belonged to another session or the session is not active.
    Stale,
    Ticked { remaining_secs: u32 },
    /// Remaining time just crossed the warning threshold.
    Warning { remaining_secs: u32 },
    TimedOut(Completion),
}

/// Result of the "Next" action on an active session.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Moved { index: usize },
    Finished(Completion),
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Synchronous state machine for one timed session.
///
/// The controller never spawns or sleeps. Countdown ticks arrive through
/// [`SessionController::tick`] tagged with the generation that produced them;
/// every `start` and `exit` bumps the generation so ticks from an earlier
/// session become no-ops.
pub struct SessionController {
    clock: Clock,
    generation: u64,
    phase: SessionPhase,
    config: Option<SessionConfig>,
    questions: Arc<[Question]>,
    answers: Vec<Option<usize>>,
    flags: Vec<bool>,
    dwell_ms: Vec<u64>,
    viewing_since: Option<DateTime<Utc>>,
    current: usize,
    remaining_secs: u32,
    warning_shown: bool,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    result: Option<ExamResult>,
}

impl SessionController {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            generation: 0,
            phase: SessionPhase::NotStarted,
            config: None,
            questions: Arc::from(Vec::<Question>::new()),
            answers: Vec::new(),
            flags: Vec::new(),
            dwell_ms: Vec::new(),
            viewing_since: None,
            current: 0,
            remaining_secs: 0,
            warning_shown: false,
            started_at: None,
            finished_at: None,
            result: None,
        }
    }

    /// Mark the session as waiting on its question source.
    ///
    /// Returns `false` (and changes nothing) while a session is active or
    /// another load is already in flight.
    pub fn begin_loading(&mut self) -> bool {
        if self.phase.is_active() || self.phase == SessionPhase::Loading {
            return false;
        }
        self.phase = SessionPhase::Loading;
        true
    }

    /// Return to `NotStarted` after a failed load.
    pub fn abort_loading(&mut self) {
        if self.phase == SessionPhase::Loading {
            self.phase = SessionPhase::NotStarted;
        }
    }

    /// Begin a fresh session with `questions`.
    ///
    /// Returns `Ok(false)` without touching anything if a session is already
    /// active. On success every piece of per-session state is reset and the
    /// generation is bumped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` if the config is invalid or the
    /// number of questions does not equal `question_count`.
    pub fn start(
        &mut self,
        config: SessionConfig,
        questions: impl Into<Arc<[Question]>>,
    ) -> Result<bool, SessionError> {
        if !self.phase.can_start() {
            return Ok(false);
        }
        config.validate()?;
        let questions = questions.into();
        if questions.len() != usize::try_from(config.question_count()).unwrap_or(usize::MAX) {
            return Err(ConfigError::QuestionCountMismatch {
                expected: config.question_count(),
                actual: questions.len(),
            }
            .into());
        }

        let now = self.clock.now();
        let len = questions.len();
        self.generation = self.generation.wrapping_add(1);
        self.phase = SessionPhase::Active;
        self.remaining_secs = config.time_limit_secs();
        self.config = Some(config);
        self.questions = questions;
        self.answers = vec![None; len];
        self.flags = vec![false; len];
        self.dwell_ms = vec![0; len];
        self.viewing_since = Some(now);
        self.current = 0;
        self.warning_shown = false;
        self.started_at = Some(now);
        self.finished_at = None;
        self.result = None;
        Ok(true)
    }

    /// Record `choice` for the current question, replacing any earlier answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside an active session and
    /// `SessionError::InvalidChoice` if `choice` is out of range.
    pub fn select_answer(&mut self, choice: usize) -> Result<(), SessionError> {
        self.ensure_active()?;
        let question = self
            .questions
            .get(self.current)
            .ok_or(SessionError::NotActive)?;
        if !question.has_choice(choice) {
            return Err(SessionError::InvalidChoice {
                index: choice,
                available: question.choice_count(),
            });
        }
        self.answers[self.current] = Some(choice);
        Ok(())
    }

    /// Flip the review flag on the current question.
    ///
    /// Returns `false` when flagging is disabled or the session is not active.
    pub fn toggle_flag(&mut self) -> bool {
        let allowed = self
            .config
            .as_ref()
            .is_some_and(SessionConfig::allow_flagging);
        if !self.phase.is_active() || !allowed {
            return false;
        }
        self.flags[self.current] = !self.flags[self.current];
        true
    }

    /// Move to the following question. Returns `false` on the last one.
    pub fn go_to_next(&mut self) -> bool {
        if !self.phase.is_active() || self.current + 1 >= self.questions.len() {
            return false;
        }
        self.move_to(self.current + 1);
        true
    }

    /// Move to the preceding question. Returns `false` on the first one.
    pub fn go_to_previous(&mut self) -> bool {
        if !self.phase.is_active() || self.current == 0 {
            return false;
        }
        self.move_to(self.current - 1);
        true
    }

    /// Next question, or finish when already on the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside an active session.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        self.ensure_active()?;
        if self.go_to_next() {
            return Ok(Advance::Moved {
                index: self.current,
            });
        }
        self.complete(false)
            .map(Advance::Finished)
            .ok_or(SessionError::NotActive)
    }

    /// Jump straight to question `index`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive`, `SessionError::NavigationDisabled`
    /// or `SessionError::IndexOutOfRange`; state is unchanged in each case.
    pub fn jump_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_active()?;
        let free = self
            .config
            .as_ref()
            .is_some_and(SessionConfig::allow_free_navigation);
        if !free {
            return Err(SessionError::NavigationDisabled);
        }
        if index >= self.questions.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.questions.len(),
            });
        }
        self.move_to(index);
        Ok(())
    }

    /// Learner-initiated finish.
    ///
    /// Only the first call on an active session produces a completion.
    pub fn finish(&mut self) -> Option<Completion> {
        self.complete(false)
    }

    /// Abandon the session without scoring.
    ///
    /// Any pending tick becomes stale and no result is produced.
    pub fn exit(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.phase = SessionPhase::NotStarted;
        self.config = None;
        self.questions = Arc::from(Vec::<Question>::new());
        self.answers.clear();
        self.flags.clear();
        self.dwell_ms.clear();
        self.viewing_since = None;
        self.current = 0;
        self.remaining_secs = 0;
        self.warning_shown = false;
        self.started_at = None;
        self.finished_at = None;
        self.result = None;
    }

    /// Apply one second of countdown on behalf of timer `generation`.
    pub fn tick(&mut self, generation: u64) -> TickOutcome {
        if generation != self.generation || !self.phase.is_active() {
            return TickOutcome::Stale;
        }

        let before = self.remaining_secs;
        self.remaining_secs = before.saturating_sub(1);
        if self.remaining_secs == 0 {
            return self
                .complete(true)
                .map_or(TickOutcome::Stale, TickOutcome::TimedOut);
        }

        if !self.warning_shown
            && before > WARNING_THRESHOLD_SECS
            && self.remaining_secs <= WARNING_THRESHOLD_SECS
        {
            self.warning_shown = true;
            return TickOutcome::Warning {
                remaining_secs: self.remaining_secs,
            };
        }

        TickOutcome::Ticked {
            remaining_secs: self.remaining_secs,
        }
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.phase.is_active() {
            Ok(())
        } else {
            Err(SessionError::NotActive)
        }
    }

    fn move_to(&mut self, index: usize) {
        self.settle_dwell();
        self.current = index;
    }

    /// Charge the time since the last navigation to the current question.
    fn settle_dwell(&mut self) {
        let now = self.clock.now();
        let Some(since) = self.viewing_since.replace(now) else {
            return;
        };
        let spent = u64::try_from((now - since).num_milliseconds()).unwrap_or(0);
        if let Some(slot) = self.dwell_ms.get_mut(self.current) {
            *slot = slot.saturating_add(spent);
        }
    }

    fn complete(&mut self, forced: bool) -> Option<Completion> {
        if !self.phase.is_active() {
            return None;
        }
        let config = self.config.clone()?;
        let started_at = self.started_at?;

        self.settle_dwell();
        let finished_at = self.clock.now();
        self.phase = SessionPhase::Completed;
        self.finished_at = Some(finished_at);
        self.viewing_since = None;

        let result = scorer::score(&self.questions, &self.answers, &config, self.remaining_secs);
        let response_ms = match config.response_timing() {
            ResponseTiming::PerQuestion => self.dwell_ms.clone(),
            ResponseTiming::WholeSession => {
                vec![u64::from(result.elapsed_secs()) * 1000; self.questions.len()]
            }
        };
        let outcomes = scorer::outcomes(&self.questions, &self.answers, &response_ms);
        self.result = Some(result.clone());

        Some(Completion {
            generation: self.generation,
            result,
            outcomes,
            started_at,
            finished_at,
            forced,
        })
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    /// Answer recorded for the current question, if any.
    #[must_use]
    pub fn current_answer(&self) -> Option<usize> {
        self.answers.get(self.current).copied().flatten()
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    #[must_use]
    pub fn flags(&self) -> &[bool] {
        &self.flags
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn warning_shown(&self) -> bool {
        self.warning_shown
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    #[must_use]
    pub fn result(&self) -> Option<&ExamResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.answers.iter().filter(|a| a.is_some()).count(),
            flagged: self.flags.iter().filter(|f| **f).count(),
            current_index: self.current,
            remaining_secs: self.remaining_secs,
            is_complete: self.phase == SessionPhase::Completed,
        }
    }

    #[must_use]
    pub fn question_statuses(&self) -> Vec<QuestionStatus> {
        (0..self.questions.len())
            .map(|index| QuestionStatus {
                index,
                answered: self.answers[index].is_some(),
                flagged: self.flags[index],
                current: index == self.current,
            })
            .collect()
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("generation", &self.generation)
            .field("phase", &self.phase)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("remaining_secs", &self.remaining_secs)
            .field("warning_shown", &self.warning_shown)
            .field("started_at", &self.started_at)
            .field("finished_at", &self.finished_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
