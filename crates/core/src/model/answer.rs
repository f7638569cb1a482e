use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ids::{ChoiceId, QuestionId};
use crate::model::question::{Choice, Question};
use crate::wrap::{Wrap, bool_field, i64_field, non_empty_str_field};

//
// ─── LABEL ────────────────────────────────────────────────────────────────────
//

/// Session-local annotation on an answer, independent of correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerLabel {
    #[default]
    None,
    Skipped,
    Marked,
}

impl AnswerLabel {
    /// Parses the persisted label name. Unknown names yield `None`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "NONE" => Some(Self::None),
            "SKIPPED" => Some(Self::Skipped),
            "MARKED" => Some(Self::Marked),
            _ => None,
        }
    }

    /// Transition applied when a record with label `incoming` arrives for a
    /// question whose current answer carries `existing`.
    ///
    /// - no existing answer: insert
    /// - marking an already-marked answer: clear the mark
    /// - marking anything else: keep the answer, set the mark
    /// - any other label: replace the whole answer
    #[must_use]
    pub fn transition(existing: Option<AnswerLabel>, incoming: AnswerLabel) -> AnswerChange {
        match (existing, incoming) {
            (None, _) => AnswerChange::Inserted,
            (Some(AnswerLabel::Marked), AnswerLabel::Marked) => AnswerChange::Unmarked,
            (Some(_), AnswerLabel::Marked) => AnswerChange::Marked,
            (Some(_), _) => AnswerChange::Replaced,
        }
    }
}

/// What happened to the answer log entry of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerChange {
    Inserted,
    Replaced,
    Marked,
    Unmarked,
}

//
// ─── ANSWER ───────────────────────────────────────────────────────────────────
//

/// The single answer-log entry for a question.
///
/// `id` is the selected choice's id; it and `selected_choice` are absent for
/// skips and for marks placed before any selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(rename = "answerID")]
    pub id: Option<ChoiceId>,
    #[serde(rename = "questionID")]
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub label: AnswerLabel,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub selected_choice: Option<Choice>,
}

impl Answer {
    /// Builds an answer; correctness is taken from the selected choice.
    #[must_use]
    pub fn new(
        question_id: QuestionId,
        selected_choice: Option<Choice>,
        label: AnswerLabel,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: selected_choice.as_ref().map(|c| c.id.clone()),
            is_correct: selected_choice.as_ref().is_some_and(|c| c.is_answer),
            question_id,
            label,
            timestamp,
            selected_choice,
        }
    }

    #[must_use]
    pub fn selected(choice: &Choice, timestamp: DateTime<Utc>) -> Self {
        Self::new(
            choice.question_id.clone(),
            Some(choice.clone()),
            AnswerLabel::None,
            timestamp,
        )
    }

    #[must_use]
    pub fn skipped(question_id: QuestionId, timestamp: DateTime<Utc>) -> Self {
        Self::new(question_id, None, AnswerLabel::Skipped, timestamp)
    }

    /// True when a choice was actually picked.
    #[must_use]
    pub fn has_selection(&self) -> bool {
        self.selected_choice.is_some()
    }

    /// Merges `incoming` into the slot holding `existing`.
    ///
    /// Returns the entry to store and the change that was applied.
    #[must_use]
    pub fn merge(existing: Option<&Answer>, incoming: Answer) -> (Answer, AnswerChange) {
        let change = AnswerLabel::transition(existing.map(|a| a.label), incoming.label);
        let stored = match (change, existing) {
            (AnswerChange::Marked, Some(prev)) => Answer {
                label: AnswerLabel::Marked,
                ..prev.clone()
            },
            (AnswerChange::Unmarked, Some(prev)) => Answer {
                label: AnswerLabel::None,
                ..prev.clone()
            },
            _ => incoming,
        };
        (stored, change)
    }
}

//
// ─── NULLABLE NORMALIZED ANSWER ───────────────────────────────────────────────
//

/// An answer record read back from untyped storage, with every default
/// replaced by `None`.
///
/// Used only for identity comparisons: a missing question id must never match
/// a question whose id happens to equal the template default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedAnswer {
    pub answer_id: Option<String>,
    pub question_id: Option<String>,
    pub is_correct: Option<bool>,
    pub label: Option<AnswerLabel>,
    pub timestamp_ms: Option<i64>,
    pub selected_choice_id: Option<String>,
}

impl Wrap for NormalizedAnswer {
    fn template() -> Self {
        Self::default()
    }

    fn wrap(raw: &Value) -> Self {
        Self {
            answer_id: non_empty_str_field(raw, "answerID"),
            question_id: non_empty_str_field(raw, "questionID"),
            is_correct: bool_field(raw, "isCorrect"),
            label: raw
                .get("label")
                .and_then(Value::as_str)
                .and_then(AnswerLabel::from_name),
            timestamp_ms: i64_field(raw, "timestamp"),
            selected_choice_id: raw
                .get("selectedChoice")
                .and_then(|c| non_empty_str_field(c, "choiceID")),
        }
    }
}

impl NormalizedAnswer {
    #[must_use]
    pub fn matches(&self, question: &Question) -> bool {
        self.question_id.as_deref() == Some(question.id.as_str())
    }

    /// Rebuilds a typed answer against the question it belongs to.
    ///
    /// The selected choice is resolved by id inside `question` and correctness
    /// is recomputed from it; the stored `isCorrect` flag is not trusted.
    /// Returns `None` if the record is for another question or names a choice
    /// the question does not have.
    #[must_use]
    pub fn rehydrate(&self, question: &Question) -> Option<Answer> {
        if !self.matches(question) {
            return None;
        }
        let choice_id = self
            .selected_choice_id
            .as_deref()
            .or(self.answer_id.as_deref());
        let selected = match choice_id {
            Some(id) => Some(question.choice(&ChoiceId::from_raw(id))?.clone()),
            None => None,
        };
        let timestamp = self
            .timestamp_ms
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_default();
        Some(Answer::new(
            question.id.clone(),
            selected,
            self.label.unwrap_or_default(),
            timestamp,
        ))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::{ChoiceDraft, QuestionDraft};
    use crate::time::fixed_now;
    use serde_json::json;

    fn question() -> Question {
        QuestionDraft::new(
            "Largest planet?",
            vec![ChoiceDraft::new("Jupiter", true), ChoiceDraft::new("Mars", false)],
        )
        .assign_id(QuestionId::compose(0, 0, 3))
    }

    #[test]
    fn correctness_comes_from_selected_choice() {
        let q = question();
        let right = Answer::selected(&q.choices[0], fixed_now());
        let wrong = Answer::selected(&q.choices[1], fixed_now());
        assert!(right.is_correct);
        assert!(!wrong.is_correct);
        assert_eq!(right.id.as_ref(), Some(&q.choices[0].id));
    }

    #[test]
    fn skip_has_no_selection_and_is_incorrect() {
        let skip = Answer::skipped(question().id, fixed_now());
        assert!(!skip.is_correct);
        assert!(!skip.has_selection());
        assert!(skip.id.is_none());
        assert_eq!(skip.label, AnswerLabel::Skipped);
    }

    #[test]
    fn transition_table() {
        use AnswerChange::*;
        use AnswerLabel as L;
        assert_eq!(AnswerLabel::transition(None, L::Marked), Inserted);
        assert_eq!(AnswerLabel::transition(None, L::None), Inserted);
        assert_eq!(AnswerLabel::transition(Some(L::Marked), L::Marked), Unmarked);
        assert_eq!(AnswerLabel::transition(Some(L::None), L::Marked), Marked);
        assert_eq!(AnswerLabel::transition(Some(L::Skipped), L::Marked), Marked);
        assert_eq!(AnswerLabel::transition(Some(L::Marked), L::None), Replaced);
        assert_eq!(AnswerLabel::transition(Some(L::None), L::Skipped), Replaced);
    }

    #[test]
    fn marking_keeps_the_recorded_choice() {
        let q = question();
        let answered = Answer::selected(&q.choices[0], fixed_now());
        let mark = Answer::new(q.id.clone(), None, AnswerLabel::Marked, fixed_now());

        let (stored, change) = Answer::merge(Some(&answered), mark);
        assert_eq!(change, AnswerChange::Marked);
        assert_eq!(stored.label, AnswerLabel::Marked);
        assert_eq!(stored.selected_choice, answered.selected_choice);
        assert!(stored.is_correct);
    }

    #[test]
    fn double_mark_restores_previous_state() {
        let q = question();
        let answered = Answer::selected(&q.choices[1], fixed_now());
        let mark = || Answer::new(q.id.clone(), None, AnswerLabel::Marked, fixed_now());

        let (marked, _) = Answer::merge(Some(&answered), mark());
        let (unmarked, change) = Answer::merge(Some(&marked), mark());
        assert_eq!(change, AnswerChange::Unmarked);
        assert_eq!(unmarked, answered);
    }

    #[test]
    fn label_serializes_in_upper_case() {
        assert_eq!(
            serde_json::to_string(&AnswerLabel::Skipped).unwrap(),
            "\"SKIPPED\""
        );
        assert_eq!(AnswerLabel::from_name("marked"), Some(AnswerLabel::Marked));
        assert_eq!(AnswerLabel::from_name("bookmark"), None);
    }

    #[test]
    fn normalized_answer_uses_none_sentinels() {
        let n = NormalizedAnswer::wrap(&json!({ "questionID": "", "answerID": "  " }));
        assert_eq!(n, NormalizedAnswer::template());

        let blank = QuestionDraft::new("Q", vec![ChoiceDraft::new("a", true)])
            .assign_id(QuestionId::compose(0, 0, 0));
        assert!(!n.matches(&blank));
    }

    #[test]
    fn rehydrate_recomputes_correctness() {
        let q = question();
        let raw = json!({
            "answerID": "0-0-3-1",
            "questionID": "0-0-3",
            "isCorrect": true,
            "label": "MARKED",
            "timestamp": 1_700_000_000_000_i64,
            "selectedChoice": { "choiceID": "0-0-3-1" }
        });
        let answer = NormalizedAnswer::wrap(&raw).rehydrate(&q).unwrap();
        assert!(!answer.is_correct);
        assert_eq!(answer.label, AnswerLabel::Marked);
        assert_eq!(answer.timestamp, fixed_now());
    }

    #[test]
    fn rehydrate_rejects_foreign_records() {
        let q = question();
        let other = NormalizedAnswer::wrap(&json!({ "questionID": "9-9-9" }));
        assert!(other.rehydrate(&q).is_none());

        let unknown_choice =
            NormalizedAnswer::wrap(&json!({ "questionID": "0-0-3", "answerID": "0-0-3-7" }));
        assert!(unknown_choice.rehydrate(&q).is_none());
    }

    #[test]
    fn rehydrated_skip_has_no_selection() {
        let q = question();
        let raw = json!({ "questionID": "0-0-3", "label": "SKIPPED" });
        let answer = NormalizedAnswer::wrap(&raw).rehydrate(&q).unwrap();
        assert!(!answer.has_selection());
        assert_eq!(answer.label, AnswerLabel::Skipped);
    }
}
