//! Fire-and-forget submission of finished work to a `ResultReporter`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use exam_core::model::{AnswerBatch, ExamResult, OutcomeRecord, SubjectId, UserId};
use storage::repository::ResultReporter;

use crate::sessions::Completion;

/// Final state of one report attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportStatus {
    Submitted { records: usize },
    /// No learner identity or no sink; nothing was sent.
    Skipped,
    Failed { reason: String },
}

/// Handle to a report that may still be in flight.
///
/// Dropping the ticket does not cancel the submission.
pub struct ReportTicket {
    inner: TicketState,
}

enum TicketState {
    Ready(ReportStatus),
    Pending(JoinHandle<ReportStatus>),
}

impl ReportTicket {
    fn ready(status: ReportStatus) -> Self {
        Self {
            inner: TicketState::Ready(status),
        }
    }

    /// Wait for the submission to settle.
    pub async fn status(self) -> ReportStatus {
        match self.inner {
            TicketState::Ready(status) => status,
            TicketState::Pending(handle) => handle
                .await
                .unwrap_or_else(|err| ReportStatus::Failed {
                    reason: err.to_string(),
                }),
        }
    }
}

impl fmt::Debug for ReportTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            TicketState::Ready(status) => f.debug_tuple("ReportTicket").field(status).finish(),
            TicketState::Pending(_) => f.write_str("ReportTicket(pending)"),
        }
    }
}

/// Builds answer batches for one subject and hands them to the reporter.
#[derive(Clone)]
pub struct ReportDispatcher {
    reporter: Option<Arc<dyn ResultReporter>>,
    user_id: Option<UserId>,
    subject_id: SubjectId,
}

impl ReportDispatcher {
    #[must_use]
    pub fn new(
        reporter: Option<Arc<dyn ResultReporter>>,
        user_id: Option<UserId>,
        subject_id: SubjectId,
    ) -> Self {
        Self {
            reporter,
            user_id,
            subject_id,
        }
    }

    /// Report a completed timed session.
    #[must_use]
    pub fn dispatch_completion(&self, completion: &Completion) -> ReportTicket {
        self.dispatch(
            completion.started_at,
            completion.finished_at,
            Some(completion.result.clone()),
            completion.outcomes.clone(),
        )
    }

    /// Spawn a submission task, or skip when there is nobody to report for.
    ///
    /// Must be called from within a tokio runtime unless reporting is skipped.
    #[must_use]
    pub fn dispatch(
        &self,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        result: Option<ExamResult>,
        outcomes: Vec<OutcomeRecord>,
    ) -> ReportTicket {
        let (Some(reporter), Some(user_id)) = (self.reporter.as_ref(), self.user_id) else {
            debug!(subject_id = %self.subject_id, "no learner or reporter; report skipped");
            return ReportTicket::ready(ReportStatus::Skipped);
        };

        let batch = AnswerBatch {
            user_id,
            subject_id: self.subject_id,
            started_at,
            finished_at,
            result,
            outcomes,
        };
        let reporter = Arc::clone(reporter);
        let handle = tokio::spawn(async move {
            let records = batch.outcomes.len();
            match reporter.submit(&batch).await {
                Ok(()) => {
                    info!(
                        user_id = %batch.user_id,
                        subject_id = %batch.subject_id,
                        records,
                        "answer batch submitted"
                    );
                    ReportStatus::Submitted { records }
                }
                Err(err) => {
                    warn!(
                        user_id = %batch.user_id,
                        subject_id = %batch.subject_id,
                        error = %err,
                        "answer batch submission failed"
                    );
                    ReportStatus::Failed {
                        reason: err.to_string(),
                    }
                }
            }
        });
        ReportTicket {
            inner: TicketState::Pending(handle),
        }
    }
}

impl fmt::Debug for ReportDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportDispatcher")
            .field("has_reporter", &self.reporter.is_some())
            .field("user_id", &self.user_id)
            .field("subject_id", &self.subject_id)
            .finish()
    }
}
