#![forbid(unsafe_code)]

pub mod generator;
pub mod repository;
pub mod sqlite;

pub use generator::{SeededQuestionGenerator, subject_start_id};
pub use repository::{
    AdaptiveQuestionSource, InMemoryRepository, QuestionRepository, QuestionSource,
    ResultReporter, Storage, StorageError,
};
