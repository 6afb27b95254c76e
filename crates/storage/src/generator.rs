use exam_core::model::{Choice, Question, QuestionError, QuestionId, SubjectId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CHOICE_TEXTS: [(&str, &str); 4] = [
    ("A", "First possible answer that could be correct or incorrect."),
    ("B", "Second possible answer with different wording and approach."),
    ("C", "Third option that presents another perspective on the question."),
    ("D", "Fourth and final option to consider for this question."),
];

/// Id block reserved for each subject's generated questions.
pub const IDS_PER_SUBJECT: u64 = 10_000;

/// First id for `count` generated questions appended after `existing` ones in
/// the subject's block, so banks for different subjects never share ids.
///
/// Returns `None` when the subject id is too large for the numbering scheme.
#[must_use]
pub fn subject_start_id(subject_id: SubjectId, existing: u64, count: u64) -> Option<u64> {
    let start = subject_id
        .value()
        .checked_mul(IDS_PER_SUBJECT)?
        .checked_add(existing)?
        .checked_add(1)?;
    start.checked_add(count)?;
    Some(start)
}

/// Deterministic demo question factory.
///
/// The same seed always yields the same correct answers and difficulties.
/// Only demos and seeding use this; sessions never draw randomness.
#[derive(Debug, Clone)]
pub struct SeededQuestionGenerator {
    rng: StdRng,
    next_id: u64,
}

impl SeededQuestionGenerator {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Start numbering generated questions at `id`.
    #[must_use]
    pub fn starting_at(mut self, id: u64) -> Self {
        self.next_id = id;
        self
    }

    /// Generate `count` four-choice questions for `subject_id`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if a generated record fails validation.
    pub fn generate(
        &mut self,
        subject_id: SubjectId,
        topic: &str,
        count: u32,
    ) -> Result<Vec<Question>, QuestionError> {
        let mut out = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
        for n in 1..=count {
            let id = QuestionId::new(self.next_id);
            self.next_id += 1;

            let choices = CHOICE_TEXTS
                .iter()
                .map(|(label, text)| Choice::new(*label, *text))
                .collect();
            let correct = self.rng.random_range(0..CHOICE_TEXTS.len());
            let difficulty = self
                .rng
                .random_range(Question::MIN_DIFFICULTY..=Question::MAX_DIFFICULTY);
            let stem = format!(
                "{topic} #{n}: this sample question tests a specific topic in this subject area. \
                 What is the correct answer?"
            );

            out.push(Question::new(id, subject_id, stem, choices, correct, difficulty)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_questions() {
        let a = SeededQuestionGenerator::new(7)
            .generate(SubjectId::new(1), "Science", 10)
            .unwrap();
        let b = SeededQuestionGenerator::new(7)
            .generate(SubjectId::new(1), "Science", 10)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn ids_continue_across_calls() {
        let mut generator = SeededQuestionGenerator::new(1).starting_at(100);
        let first = generator.generate(SubjectId::new(1), "Math", 2).unwrap();
        let second = generator.generate(SubjectId::new(2), "Science", 1).unwrap();
        assert_eq!(first[0].id(), QuestionId::new(100));
        assert_eq!(first[1].id(), QuestionId::new(101));
        assert_eq!(second[0].id(), QuestionId::new(102));
        assert_eq!(second[0].subject_id(), SubjectId::new(2));
    }

    #[test]
    fn subjects_get_disjoint_id_blocks() {
        let first = subject_start_id(SubjectId::new(1), 0, 45).unwrap();
        let second = subject_start_id(SubjectId::new(2), 0, 45).unwrap();
        assert_eq!(first, 10_001);
        assert_eq!(second, 20_001);
        assert!(first + 45 <= second);
        assert_eq!(subject_start_id(SubjectId::new(2), 15, 5), Some(20_016));
    }

    #[test]
    fn oversized_subject_has_no_start_id() {
        assert_eq!(subject_start_id(SubjectId::new(u64::MAX), 0, 1), None);
        let largest = SubjectId::new(u64::MAX / IDS_PER_SUBJECT);
        assert!(subject_start_id(largest, 0, 1).is_some());
        assert_eq!(subject_start_id(largest, 0, u64::MAX), None);
    }

    #[test]
    fn generated_questions_are_in_range() {
        let questions = SeededQuestionGenerator::new(42)
            .generate(SubjectId::new(3), "History", 50)
            .unwrap();
        for q in &questions {
            assert_eq!(q.choice_count(), 4);
            assert!(q.correct_choice() < 4);
            assert!((1..=5).contains(&q.difficulty()));
        }
    }
}
