#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod reporting;
pub mod sessions;
pub mod time_fmt;

pub use exam_core::Clock;

pub use error::SessionError;
pub use reporting::{ReportDispatcher, ReportStatus, ReportTicket};
pub use sessions::{
    Advance, Completion, ExamService, ExamSession, PracticeService, PracticeSession,
    SessionController, SessionEvent, SessionProgress,
};
