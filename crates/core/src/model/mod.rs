mod config;
mod ids;
mod question;
mod session;

pub use ids::{ParseIdError, QuestionId, SubjectId, UserId};

pub use config::{ConfigError, ResponseTiming, SessionConfig};
pub use question::{Choice, Question, QuestionError};
pub use session::{AnswerBatch, ExamResult, ExamResultError, OutcomeRecord, SessionPhase};
