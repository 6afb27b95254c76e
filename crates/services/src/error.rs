//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::ConfigError;
use storage::repository::StorageError;

/// Errors emitted by session services.
///
/// Every variant other than `Source` leaves session state untouched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("choice {index} is not valid for a question with {available} choices")]
    InvalidChoice { index: usize, available: usize },

    #[error("question {index} is out of range for {len} questions")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("free navigation is disabled for this session")]
    NavigationDisabled,

    #[error("session is not active")]
    NotActive,

    #[error("session is already running or loading")]
    AlreadyActive,

    #[error("not enough questions: requested {requested}, available {available}")]
    InsufficientQuestions { requested: u32, available: usize },

    #[error("answer already submitted for this question")]
    AnswerLocked,

    #[error("no answer selected")]
    NoSelection,

    #[error("no question loaded")]
    NoQuestion,

    #[error(transparent)]
    Source(#[from] StorageError),
}
