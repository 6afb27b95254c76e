mod controller;
mod events;
mod exam;
mod practice;
mod progress;
mod timer;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{
    Advance, Completion, SessionController, TickOutcome, WARNING_THRESHOLD_SECS,
};
pub use events::SessionEvent;
pub use exam::{ExamService, ExamSession};
pub use practice::{
    PracticeFeedback, PracticeService, PracticeSession, PracticeStats, PracticeSubmission,
};
pub use progress::{QuestionStatus, SessionProgress};
pub use timer::{SessionTimer, SharedController};
