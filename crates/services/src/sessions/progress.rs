use serde::Serialize;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub flagged: usize,
    pub current_index: usize,
    pub remaining_secs: u32,
    pub is_complete: bool,
}

/// Per-question marker for a question palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuestionStatus {
    pub index: usize,
    pub answered: bool,
    pub flagged: bool,
    pub current: bool,
}
