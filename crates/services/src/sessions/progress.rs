use serde::Serialize;

use quiz_core::model::{Answer, DurationSample, Question, QuestionId};

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub total: usize,
    pub revealed: usize,
    /// Questions with a selected choice.
    pub answered: usize,
    pub skipped: usize,
    pub marked: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

/// Read-only copy of a session for rendering the current question list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub visible: Vec<Question>,
    pub remaining: usize,
    /// Ordered by question id.
    pub answers: Vec<Answer>,
    pub durations: Vec<DurationSample>,
    pub frontier: Option<QuestionId>,
}
