use crate::reporting::ReportTicket;

use super::controller::Completion;

/// Notifications pushed to whoever renders a running session.
#[derive(Debug)]
pub enum SessionEvent {
    /// One second elapsed.
    Tick { remaining_secs: u32 },
    /// Remaining time just reached the warning threshold. Sent at most once.
    TimeWarning { remaining_secs: u32 },
    /// The session finished, either by timeout or by the learner.
    Completed {
        completion: Completion,
        report: ReportTicket,
    },
}
