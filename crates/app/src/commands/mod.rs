pub mod exams;
pub mod practice;
pub mod timed;

use exam_core::model::Question;

/// Print a question with its choices, marking `selected`.
pub(crate) fn print_question(question: &Question, selected: Option<usize>) {
    println!();
    println!("{}", question.stem());
    for (index, choice) in question.choices().iter().enumerate() {
        let marker = if selected == Some(index) { '>' } else { ' ' };
        println!(" {marker} {}. {}", choice.label, choice.text);
    }
}

/// Resolve a typed choice label (case-insensitive) or 1-based number.
pub(crate) fn parse_choice(question: &Question, input: &str) -> Option<usize> {
    if let Some(index) = question
        .choices()
        .iter()
        .position(|choice| choice.label.eq_ignore_ascii_case(input))
    {
        return Some(index);
    }
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .filter(|index| question.has_choice(*index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Choice, QuestionId, SubjectId};

    #[test]
    fn choices_parse_by_label_or_number() {
        let question = Question::new(
            QuestionId::new(1),
            SubjectId::new(1),
            "Pick one",
            vec![Choice::new("A", "x"), Choice::new("B", "y")],
            1,
            2,
        )
        .unwrap();
        assert_eq!(parse_choice(&question, "b"), Some(1));
        assert_eq!(parse_choice(&question, "1"), Some(0));
        assert_eq!(parse_choice(&question, "3"), None);
        assert_eq!(parse_choice(&question, "0"), None);
        assert_eq!(parse_choice(&question, "z"), None);
    }
}
