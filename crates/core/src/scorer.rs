//! Pure scoring of a finished session.
//!
//! Nothing here reads the clock or mutates state: identical inputs always
//! produce identical results.

use crate::model::{ExamResult, OutcomeRecord, Question, SessionConfig};

/// Score a session from its final answer state.
///
/// `answers[i]` is the choice selected for `questions[i]`; a missing entry
/// counts as skipped. `remaining_secs` is the countdown value at the moment
/// the session finished.
#[must_use]
pub fn score(
    questions: &[Question],
    answers: &[Option<usize>],
    config: &SessionConfig,
    remaining_secs: u32,
) -> ExamResult {
    let mut correct = 0_u32;
    let mut incorrect = 0_u32;
    let mut skipped = 0_u32;

    for (index, question) in questions.iter().enumerate() {
        match answers.get(index).copied().flatten() {
            None => skipped = skipped.saturating_add(1),
            Some(choice) if question.is_correct(choice) => correct = correct.saturating_add(1),
            Some(_) => incorrect = incorrect.saturating_add(1),
        }
    }

    let elapsed_secs = config.time_limit_secs().saturating_sub(remaining_secs);
    ExamResult::tally(
        correct,
        incorrect,
        skipped,
        elapsed_secs,
        config.passing_score_percent(),
    )
}

/// `round(100 * correct / total)`, rounding halves up. Zero questions score 0.
#[must_use]
pub fn score_percent(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    let rounded = (200 * correct + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

/// Build per-question outcome records for the result sink.
///
/// `response_ms[i]` is charged to question `i`; missing entries count as 0.
#[must_use]
pub fn outcomes(
    questions: &[Question],
    answers: &[Option<usize>],
    response_ms: &[u64],
) -> Vec<OutcomeRecord> {
    questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let selected_choice = answers.get(index).copied().flatten();
            OutcomeRecord {
                question_id: question.id(),
                selected_choice,
                is_correct: selected_choice.is_some_and(|c| question.is_correct(c)),
                response_ms: response_ms.get(index).copied().unwrap_or(0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Choice, QuestionId, SubjectId};

    fn question(id: u64, correct: usize) -> Question {
        let choices = ["A", "B", "C", "D"]
            .iter()
            .map(|l| Choice::new(*l, *l))
            .collect();
        let id = QuestionId::new(id);
        Question::new(id, SubjectId::new(1), "Q", choices, correct, 3).unwrap()
    }

    fn config(count: u32, passing: u8) -> SessionConfig {
        SessionConfig::new(count, 600, true, true, passing).unwrap()
    }

    #[test]
    fn scores_mixed_answers() {
        let questions = vec![question(1, 0), question(2, 1), question(3, 2), question(4, 3)];
        let answers = vec![Some(0), Some(3), None, Some(3)];

        let result = score(&questions, &answers, &config(4, 65), 480);

        assert_eq!(result.total_questions(), 4);
        assert_eq!(result.correct_count(), 2);
        assert_eq!(result.incorrect_count(), 1);
        assert_eq!(result.skipped_count(), 1);
        assert_eq!(result.score_percent(), 50);
        assert!(!result.passed());
        assert_eq!(result.elapsed_secs(), 120);
    }

    #[test]
    fn score_is_idempotent() {
        let questions = vec![question(1, 2), question(2, 2), question(3, 0)];
        let answers = vec![Some(2), None, Some(1)];
        let cfg = config(3, 30);

        let first = score(&questions, &answers, &cfg, 10);
        let second = score(&questions, &answers, &cfg, 10);
        assert_eq!(first, second);
    }

    #[test]
    fn counts_always_sum_to_total() {
        let questions: Vec<_> = (0..7).map(|i| question(i, (i % 4) as usize)).collect();
        let answer_sets = [
            vec![None; 7],
            vec![Some(0); 7],
            vec![Some(0), None, Some(2), Some(2), None, Some(1), Some(3)],
            vec![Some(1)],
        ];
        for answers in &answer_sets {
            let result = score(&questions, answers, &config(7, 65), 0);
            assert_eq!(
                result.correct_count() + result.incorrect_count() + result.skipped_count(),
                result.total_questions()
            );
        }
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(score_percent(1, 8), 13);
        assert_eq!(score_percent(1, 3), 33);
        assert_eq!(score_percent(2, 3), 67);
        assert_eq!(score_percent(13, 20), 65);
        assert_eq!(score_percent(0, 0), 0);
        assert_eq!(score_percent(5, 5), 100);
    }

    #[test]
    fn pass_mark_is_inclusive() {
        let questions: Vec<_> = (0..20).map(|i| question(i, 0)).collect();
        let mut answers = vec![Some(1); 20];
        for answer in answers.iter_mut().take(13) {
            *answer = Some(0);
        }
        let result = score(&questions, &answers, &config(20, 65), 0);
        assert_eq!(result.score_percent(), 65);
        assert!(result.passed());
    }

    #[test]
    fn outcomes_mark_correctness_and_timing() {
        let questions = vec![question(10, 1), question(11, 0)];
        let records = outcomes(&questions, &[Some(1), None], &[1500]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].question_id, QuestionId::new(10));
        assert!(records[0].is_correct);
        assert_eq!(records[0].response_ms, 1500);
        assert_eq!(records[1].selected_choice, None);
        assert!(!records[1].is_correct);
        assert_eq!(records[1].response_ms, 0);
    }
}
