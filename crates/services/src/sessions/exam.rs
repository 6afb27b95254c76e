use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};

use exam_core::Clock;
use exam_core::model::{ExamResult, Question, SessionConfig, SessionPhase, SubjectId, UserId};
use storage::repository::{QuestionSource, ResultReporter};

use super::controller::{Advance, Completion, SessionController};
use super::events::SessionEvent;
use super::progress::{QuestionStatus, SessionProgress};
use super::timer::{SessionTimer, SharedController, lock};
use crate::error::SessionError;
use crate::reporting::ReportDispatcher;

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Starts timed sessions against a question source.
#[derive(Clone)]
pub struct ExamService {
    clock: Clock,
    source: Arc<dyn QuestionSource>,
    reporter: Option<Arc<dyn ResultReporter>>,
    user_id: Option<UserId>,
}

impl ExamService {
    #[must_use]
    pub fn new(clock: Clock, source: Arc<dyn QuestionSource>) -> Self {
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

    /// Learner on whose behalf results are reported. `None` skips reporting.
    #[must_use]
    pub fn with_user(mut self, user_id: Option<UserId>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Load questions and start a timed session.
    ///
    /// The returned receiver yields ticks, the low-time warning and the
    /// completion event for this session and any later restart of it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` for an invalid config,
    /// `SessionError::Source` if loading fails and
    /// `SessionError::InsufficientQuestions` if the source comes up short.
    pub async fn start(
        &self,
        subject_id: SubjectId,
        config: SessionConfig,
    ) -> Result<(ExamSession, UnboundedReceiver<SessionEvent>), SessionError> {
        let (events, receiver) = mpsc::unbounded_channel();
        let session = ExamSession {
            controller: Arc::new(Mutex::new(SessionController::new(self.clock.clone()))),
            timer: Mutex::new(None),
            events,
            dispatcher: ReportDispatcher::new(self.reporter.clone(), self.user_id, subject_id),
            subject_id,
        };
        if !self.launch(&session, config).await? {
            return Err(SessionError::AlreadyActive);
        }
        Ok((session, receiver))
    }

    /// Start a fresh session on an existing handle once the previous one has
    /// completed or been exited.
    ///
    /// Returns `Ok(false)` and leaves everything untouched while the session
    /// is still active or another restart is loading.
    ///
    /// # Errors
    ///
    /// Same as [`ExamService::start`].
    pub async fn restart(
        &self,
        session: &ExamSession,
        config: SessionConfig,
    ) -> Result<bool, SessionError> {
        self.launch(session, config).await
    }

    /// Load and start; `Ok(false)` if the controller refused, in which case
    /// no timer is spawned.
    async fn launch(
        &self,
        session: &ExamSession,
        config: SessionConfig,
    ) -> Result<bool, SessionError> {
        config.validate()?;
        if !lock(&session.controller).begin_loading() {
            return Ok(false);
        }

        let questions = match self.load(session.subject_id, config.question_count()).await {
            Ok(questions) => questions,
            Err(err) => {
                warn!(subject_id = %session.subject_id, error = %err, "question load failed");
                lock(&session.controller).abort_loading();
                return Err(err);
            }
        };

        let generation = {
            let mut controller = lock(&session.controller);
            match controller.start(config, questions) {
                Ok(true) => controller.generation(),
                Ok(false) => return Ok(false),
                Err(err) => {
                    controller.abort_loading();
                    return Err(err);
                }
            }
        };

        let timer = SessionTimer::spawn(
            Arc::clone(&session.controller),
            generation,
            session.events.clone(),
            session.dispatcher.clone(),
        );
        session.replace_timer(Some(timer));

        let controller = lock(&session.controller);
        info!(
            subject_id = %session.subject_id,
            generation,
            questions = controller.questions().len(),
            time_limit_secs = controller.remaining_secs(),
            "session started"
        );
        Ok(true)
    }

    async fn load(
        &self,
        subject_id: SubjectId,
        requested: u32,
    ) -> Result<Vec<Question>, SessionError> {
        let mut questions = self.source.fetch_questions(subject_id, requested).await?;
        let wanted = usize::try_from(requested).unwrap_or(usize::MAX);
        if questions.len() < wanted {
            return Err(SessionError::InsufficientQuestions {
                requested,
                available: questions.len(),
            });
        }
        questions.truncate(wanted);
        Ok(questions)
    }
}

impl fmt::Debug for ExamService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamService")
            .field("clock", &self.clock)
            .field("has_reporter", &self.reporter.is_some())
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

//
// ─── SESSION HANDLE ────────────────────────────────────────────────────────────
//

/// Learner-facing handle to a running timed session.
///
/// All learner commands go through the shared controller, so they serialize
/// with countdown ticks.
pub struct ExamSession {
    controller: SharedController,
    timer: Mutex<Option<SessionTimer>>,
    events: UnboundedSender<SessionEvent>,
    dispatcher: ReportDispatcher,
    subject_id: SubjectId,
}

impl ExamSession {
    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        lock(&self.controller).phase()
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        lock(&self.controller).generation()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        lock(&self.controller).remaining_secs()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        lock(&self.controller).current_index()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<Question> {
        lock(&self.controller).current_question().cloned()
    }

    #[must_use]
    pub fn current_answer(&self) -> Option<usize> {
        lock(&self.controller).current_answer()
    }

    #[must_use]
    pub fn answers(&self) -> Vec<Option<usize>> {
        lock(&self.controller).answers().to_vec()
    }

    #[must_use]
    pub fn flags(&self) -> Vec<bool> {
        lock(&self.controller).flags().to_vec()
    }

    #[must_use]
    pub fn config(&self) -> Option<SessionConfig> {
        lock(&self.controller).config().cloned()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        lock(&self.controller).progress()
    }

    #[must_use]
    pub fn question_statuses(&self) -> Vec<QuestionStatus> {
        lock(&self.controller).question_statuses()
    }

    #[must_use]
    pub fn result(&self) -> Option<ExamResult> {
        lock(&self.controller).result().cloned()
    }

    /// # Errors
    ///
    /// See [`SessionController::select_answer`].
    pub fn select_answer(&self, choice: usize) -> Result<(), SessionError> {
        lock(&self.controller).select_answer(choice)
    }

    pub fn toggle_flag(&self) -> bool {
        lock(&self.controller).toggle_flag()
    }

    pub fn next(&self) -> bool {
        lock(&self.controller).go_to_next()
    }

    pub fn previous(&self) -> bool {
        lock(&self.controller).go_to_previous()
    }

    /// # Errors
    ///
    /// See [`SessionController::jump_to`].
    pub fn jump_to(&self, index: usize) -> Result<(), SessionError> {
        lock(&self.controller).jump_to(index)
    }

    /// Next question, finishing the session on the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` outside an active session.
    pub fn advance(&self) -> Result<Advance, SessionError> {
        let advance = lock(&self.controller).advance()?;
        if let Advance::Finished(completion) = &advance {
            self.settle(completion.clone());
        }
        Ok(advance)
    }

    /// Learner-initiated finish. `None` if the session was not active, e.g.
    /// because the countdown already completed it.
    pub fn finish(&self) -> Option<Completion> {
        let completion = lock(&self.controller).finish()?;
        self.settle(completion.clone());
        Some(completion)
    }

    /// Abandon the session: no result, no report, and the timer stops.
    pub fn exit(&self) {
        lock(&self.controller).exit();
        self.replace_timer(None);
        info!(subject_id = %self.subject_id, "session exited");
    }

    fn settle(&self, completion: Completion) {
        self.replace_timer(None);
        info!(
            subject_id = %self.subject_id,
            generation = completion.generation,
            score_percent = completion.result.score_percent(),
            passed = completion.result.passed(),
            "session finished"
        );
        let report = self.dispatcher.dispatch_completion(&completion);
        let _ = self.events.send(SessionEvent::Completed { completion, report });
    }

    fn replace_timer(&self, timer: Option<SessionTimer>) {
        let mut slot = self
            .timer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(old) = slot.take() {
            old.cancel();
        }
        *slot = timer;
    }
}

impl fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExamSession")
            .field("subject_id", &self.subject_id)
            .field("controller", &*lock(&self.controller))
            .finish_non_exhaustive()
    }
}
