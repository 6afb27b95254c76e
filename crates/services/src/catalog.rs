//! Fixed list of full-length mock exams.

use serde::Serialize;

use exam_core::model::{ConfigError, SessionConfig, SubjectId};

/// One mock exam offered in the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExamPreset {
    pub id: u32,
    pub title: &'static str,
    pub description: &'static str,
    pub subject_id: SubjectId,
    pub question_count: u32,
    pub time_limit_minutes: u32,
}

impl ExamPreset {
    /// Session settings for this exam: flagging and free navigation enabled.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the preset has a zero count or time limit.
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        SessionConfig::mock_exam(self.question_count, self.time_limit_minutes)
    }
}

const MOCK_EXAMS: [ExamPreset; 5] = [
    ExamPreset {
        id: 1,
        title: "Mathematical Reasoning",
        description: "Basic math, geometry, algebra, and graphs.",
        subject_id: SubjectId::new(1),
        question_count: 45,
        time_limit_minutes: 115,
    },
    ExamPreset {
        id: 2,
        title: "Reasoning Through Language Arts",
        description: "Reading comprehension, writing, and language skills.",
        subject_id: SubjectId::new(2),
        question_count: 50,
        time_limit_minutes: 150,
    },
    ExamPreset {
        id: 3,
        title: "Science",
        description: "Life science, physical science, and Earth and space science.",
        subject_id: SubjectId::new(3),
        question_count: 40,
        time_limit_minutes: 90,
    },
    ExamPreset {
        id: 4,
        title: "Social Studies",
        description: "Civics, government, economics, geography, and history.",
        subject_id: SubjectId::new(4),
        question_count: 35,
        time_limit_minutes: 70,
    },
    ExamPreset {
        id: 5,
        title: "Practice Mini-Exam",
        description: "A shorter mixed exam drawing on every subject.",
        subject_id: SubjectId::new(5),
        question_count: 20,
        time_limit_minutes: 45,
    },
];

#[must_use]
pub fn mock_exams() -> &'static [ExamPreset] {
    &MOCK_EXAMS
}

#[must_use]
pub fn find_exam(id: u32) -> Option<&'static ExamPreset> {
    MOCK_EXAMS.iter().find(|exam| exam.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_builds_a_valid_config() {
        for exam in mock_exams() {
            let config = exam.session_config().unwrap();
            assert_eq!(config.question_count(), exam.question_count);
            assert_eq!(config.time_limit_secs(), exam.time_limit_minutes * 60);
            assert!(config.allow_flagging());
            assert!(config.allow_free_navigation());
        }
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(find_exam(3).map(|e| e.title), Some("Science"));
        assert!(find_exam(9).is_none());
    }
}
