use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, SubjectId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question stem cannot be empty")]
    EmptyStem,

    #[error("a question needs at least {min} choices, got {len}")]
    TooFewChoices { min: usize, len: usize },

    #[error("choice label cannot be empty")]
    EmptyLabel,

    #[error("duplicate choice label: {0}")]
    DuplicateLabel(String),

    #[error("correct choice {index} is out of range for {len} choices")]
    CorrectChoiceOutOfRange { index: usize, len: usize },

    #[error("difficulty must be between 1 and 5, got {0}")]
    InvalidDifficulty(u8),
}

//
// ─── CHOICE ────────────────────────────────────────────────────────────────────
//

/// One selectable option of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub text: String,
}

impl Choice {
    #[must_use]
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Immutable multiple-choice question record.
///
/// Owned by the question source; sessions only ever read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    id: QuestionId,
    subject_id: SubjectId,
    stem: String,
    choices: Vec<Choice>,
    correct_choice: usize,
    difficulty: u8,
}

impl Question {
    pub const MIN_CHOICES: usize = 2;
    pub const MIN_DIFFICULTY: u8 = 1;
    pub const MAX_DIFFICULTY: u8 = 5;

    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the stem is blank, there are fewer than two
    /// choices, labels are empty or repeated, the correct index does not point
    /// at a choice, or the difficulty is outside 1..=5.
    pub fn new(
        id: QuestionId,
        subject_id: SubjectId,
        stem: impl Into<String>,
        choices: Vec<Choice>,
        correct_choice: usize,
        difficulty: u8,
    ) -> Result<Self, QuestionError> {
        let stem = stem.into();
        if stem.trim().is_empty() {
            return Err(QuestionError::EmptyStem);
        }
        if choices.len() < Self::MIN_CHOICES {
            return Err(QuestionError::TooFewChoices {
                min: Self::MIN_CHOICES,
                len: choices.len(),
            });
        }

        let mut seen = HashSet::with_capacity(choices.len());
        for choice in &choices {
            if choice.label.trim().is_empty() {
                return Err(QuestionError::EmptyLabel);
            }
            if !seen.insert(choice.label.as_str()) {
                return Err(QuestionError::DuplicateLabel(choice.label.clone()));
            }
        }

        if correct_choice >= choices.len() {
            return Err(QuestionError::CorrectChoiceOutOfRange {
                index: correct_choice,
                len: choices.len(),
            });
        }
        if !(Self::MIN_DIFFICULTY..=Self::MAX_DIFFICULTY).contains(&difficulty) {
            return Err(QuestionError::InvalidDifficulty(difficulty));
        }

        Ok(Self {
            id,
            subject_id,
            stem,
            choices,
            correct_choice,
            difficulty,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn stem(&self) -> &str {
        &self.stem
    }

    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    #[must_use]
    pub fn choice_count(&self) -> usize {
        self.choices.len()
    }

    #[must_use]
    pub fn correct_choice(&self) -> usize {
        self.correct_choice
    }

    #[must_use]
    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    /// Returns true if `choice` is a valid index into this question's choices.
    #[must_use]
    pub fn has_choice(&self, choice: usize) -> bool {
        choice < self.choices.len()
    }

    #[must_use]
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_choice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abcd() -> Vec<Choice> {
        ["A", "B", "C", "D"]
            .iter()
            .map(|l| Choice::new(*l, format!("option {l}")))
            .collect()
    }

    fn build(
        stem: &str,
        choices: Vec<Choice>,
        correct: usize,
        difficulty: u8,
    ) -> Result<Question, QuestionError> {
        Question::new(
            QuestionId::new(1),
            SubjectId::new(1),
            stem,
            choices,
            correct,
            difficulty,
        )
    }

    #[test]
    fn builds_valid_question() {
        let q = build("2 + 2?", abcd(), 3, 2).unwrap();
        assert_eq!(q.choice_count(), 4);
        assert!(q.has_choice(3));
        assert!(!q.has_choice(4));
        assert!(q.is_correct(3));
    }

    #[test]
    fn rejects_duplicate_labels() {
        let mut choices = abcd();
        choices[2].label = "A".into();
        let err = build("Q", choices, 0, 1).unwrap_err();
        assert_eq!(err, QuestionError::DuplicateLabel("A".into()));
    }

    #[test]
    fn rejects_out_of_range_correct_choice() {
        let err = build("Q", abcd(), 4, 1).unwrap_err();
        assert!(matches!(
            err,
            QuestionError::CorrectChoiceOutOfRange { index: 4, len: 4 }
        ));
    }

    #[test]
    fn rejects_difficulty_outside_scale() {
        let err = build("Q", abcd(), 0, 6).unwrap_err();
        assert_eq!(err, QuestionError::InvalidDifficulty(6));
        let err = build("Q", abcd(), 0, 0).unwrap_err();
        assert_eq!(err, QuestionError::InvalidDifficulty(0));
    }

    #[test]
    fn rejects_blank_stem_and_single_choice() {
        let err = build("  ", abcd(), 0, 1).unwrap_err();
        assert_eq!(err, QuestionError::EmptyStem);

        let err = build("Q", vec![Choice::new("A", "only")], 0, 1).unwrap_err();
        assert_eq!(err, QuestionError::TooFewChoices { min: 2, len: 1 });
    }
}
