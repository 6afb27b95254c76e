use exam_core::model::{Choice, Question, QuestionId, SubjectId, UserId};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn subject_id_from_i64(v: i64) -> Result<SubjectId, StorageError> {
    Ok(SubjectId::new(i64_to_u64("subject_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn user_id_from_str(raw: &str) -> Result<UserId, StorageError> {
    raw.parse().map_err(ser)
}

pub(crate) fn choices_to_json(choices: &[Choice]) -> Result<String, StorageError> {
    serde_json::to_string(choices).map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let subject_id = subject_id_from_i64(row.try_get::<i64, _>("subject_id").map_err(ser)?)?;
    let stem: String = row.try_get("stem").map_err(ser)?;
    let choices_json: String = row.try_get("choices").map_err(ser)?;
    let choices: Vec<Choice> = serde_json::from_str(&choices_json).map_err(ser)?;

    let correct_i64: i64 = row.try_get("correct_choice").map_err(ser)?;
    let correct_choice = usize::try_from(correct_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid correct_choice: {correct_i64}"))
    })?;
    let difficulty_i64: i64 = row.try_get("difficulty").map_err(ser)?;
    let difficulty = u8::try_from(difficulty_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid difficulty: {difficulty_i64}")))?;

    Question::new(id, subject_id, stem, choices, correct_choice, difficulty).map_err(ser)
}
