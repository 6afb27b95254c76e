use chrono::{DateTime, Utc};
use exam_core::model::{AnswerBatch, ExamResult, SubjectId, UserId};
use sqlx::Row;

use super::{
    SqliteRepository,
    mapping::{id_i64, ser, subject_id_from_i64, u32_from_i64, user_id_from_str},
};
use crate::repository::{ResultReporter, StorageError};

/// A persisted session result with its identifying metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamResultRow {
    pub id: i64,
    pub user_id: UserId,
    pub subject_id: SubjectId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub result: ExamResult,
}

fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<ExamResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let user_id = user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let subject_id = subject_id_from_i64(row.try_get::<i64, _>("subject_id").map_err(ser)?)?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let finished_at = row.try_get("finished_at").map_err(ser)?;

    let count = |field: &'static str| -> Result<u32, StorageError> {
        u32_from_i64(field, row.try_get::<i64, _>(field).map_err(ser)?)
    };
    let passing = u8::try_from(row.try_get::<i64, _>("passing_score_percent").map_err(ser)?)
        .map_err(ser)?;

    let result = ExamResult::from_persisted(
        count("total_questions")?,
        count("correct_count")?,
        count("incorrect_count")?,
        count("skipped_count")?,
        count("elapsed_secs")?,
        passing,
    )
    .map_err(ser)?;

    Ok(ExamResultRow {
        id,
        user_id,
        subject_id,
        started_at,
        finished_at,
        result,
    })
}

impl SqliteRepository {
    /// Most recent results for a learner, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails or a row cannot be decoded.
    pub async fn recent_results(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<ExamResultRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, user_id, subject_id, started_at, finished_at, total_questions,
                    correct_count, incorrect_count, skipped_count, elapsed_secs,
                    passing_score_percent
                FROM exam_results
                WHERE user_id = ?1
                ORDER BY finished_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_result_row).collect()
    }

    /// Number of answer events recorded for a learner.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the query fails.
    pub async fn answer_event_count(&self, user_id: UserId) -> Result<u32, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM answer_events WHERE user_id = ?1")
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        u32_from_i64("count", count)
    }
}

#[async_trait::async_trait]
impl ResultReporter for SqliteRepository {
    async fn submit(&self, batch: &AnswerBatch) -> Result<(), StorageError> {
        let user = batch.user_id.to_string();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let result_id = match &batch.result {
            Some(result) => {
                let res = sqlx::query(
                    r"
                        INSERT INTO exam_results (
                            user_id, subject_id, started_at, finished_at, total_questions,
                            correct_count, incorrect_count, skipped_count, elapsed_secs,
                            passing_score_percent
                        )
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ",
                )
                .bind(&user)
                .bind(id_i64("subject_id", batch.subject_id.value())?)
                .bind(batch.started_at)
                .bind(batch.finished_at)
                .bind(i64::from(result.total_questions()))
                .bind(i64::from(result.correct_count()))
                .bind(i64::from(result.incorrect_count()))
                .bind(i64::from(result.skipped_count()))
                .bind(i64::from(result.elapsed_secs()))
                .bind(i64::from(result.passing_score_percent()))
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::Connection(e.to_string()))?;
                Some(res.last_insert_rowid())
            }
            None => None,
        };

        for outcome in &batch.outcomes {
            let selected = outcome
                .selected_choice
                .map(i64::try_from)
                .transpose()
                .map_err(ser)?;
            let response_ms = i64::try_from(outcome.response_ms).map_err(ser)?;

            sqlx::query(
                r"
                    INSERT INTO answer_events (
                        result_id, user_id, question_id, selected_choice,
                        is_correct, response_ms, answered_at
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(result_id)
            .bind(&user)
            .bind(id_i64("question_id", outcome.question_id.value())?)
            .bind(selected)
            .bind(outcome.is_correct)
            .bind(response_ms)
            .bind(batch.finished_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}
