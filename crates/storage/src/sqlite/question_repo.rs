use exam_core::model::{Question, SubjectId};

use super::{
    SqliteRepository,
    mapping::{choices_to_json, id_i64, map_question_row, u32_from_i64},
};
use crate::repository::{AdaptiveQuestionSource, QuestionRepository, QuestionSource, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let correct = i64::try_from(question.correct_choice())
            .map_err(|_| StorageError::Serialization("correct_choice overflow".into()))?;

        sqlx::query(
            r"
                INSERT INTO questions (id, subject_id, stem, choices, correct_choice, difficulty)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    subject_id = excluded.subject_id,
                    stem = excluded.stem,
                    choices = excluded.choices,
                    correct_choice = excluded.correct_choice,
                    difficulty = excluded.difficulty
            ",
        )
        .bind(id_i64("question_id", question.id().value())?)
        .bind(id_i64("subject_id", question.subject_id().value())?)
        .bind(question.stem())
        .bind(choices_to_json(question.choices())?)
        .bind(correct)
        .bind(i64::from(question.difficulty()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn count_questions(&self, subject_id: SubjectId) -> Result<u32, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE subject_id = ?1")
            .bind(id_i64("subject_id", subject_id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        u32_from_i64("count", count)
    }
}

#[async_trait::async_trait]
impl QuestionSource for SqliteRepository {
    async fn fetch_questions(
        &self,
        subject_id: SubjectId,
        count: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, subject_id, stem, choices, correct_choice, difficulty
                FROM questions
                WHERE subject_id = ?1
                ORDER BY id ASC
                LIMIT ?2
            ",
        )
        .bind(id_i64("subject_id", subject_id.value())?)
        .bind(i64::from(count))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_question_row).collect()
    }
}

#[async_trait::async_trait]
impl AdaptiveQuestionSource for SqliteRepository {
    async fn fetch_next(&self, subject_id: SubjectId) -> Result<Question, StorageError> {
        // Least-answered question first; ties go to the lowest id.
        let row = sqlx::query(
            r"
                SELECT q.id, q.subject_id, q.stem, q.choices, q.correct_choice, q.difficulty
                FROM questions q
                LEFT JOIN answer_events e ON e.question_id = q.id
                WHERE q.subject_id = ?1
                GROUP BY q.id
                ORDER BY COUNT(e.id) ASC, q.id ASC
                LIMIT 1
            ",
        )
        .bind(id_i64("subject_id", subject_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_question_row(&row)
    }
}
