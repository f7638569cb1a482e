use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::ids::{ChoiceId, QuestionId};
use crate::model::photo::PhotoUri;
use crate::wrap::{Wrap, bool_field, str_field, wrap_array};

//
// ─── DRAFTS (pre-composition) ─────────────────────────────────────────────────
//

/// A choice as found in exam content, before it belongs to a composed quiz.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChoiceDraft {
    pub value: String,
    pub is_answer: bool,
}

impl ChoiceDraft {
    #[must_use]
    pub fn new(value: impl Into<String>, is_answer: bool) -> Self {
        Self {
            value: value.into(),
            is_answer,
        }
    }

    /// A choice with blank text cannot be shown and is filtered out.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.value.trim().is_empty()
    }
}

impl Wrap for ChoiceDraft {
    fn template() -> Self {
        Self::default()
    }

    fn wrap(raw: &Value) -> Self {
        let mut out = Self::template();
        if let Some(value) = str_field(raw, "value") {
            out.value = value.to_owned();
        }
        if let Some(is_answer) = bool_field(raw, "isAnswer") {
            out.is_answer = is_answer;
        }
        out
    }
}

/// A question as found in exam content. It has no identity until composed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuestionDraft {
    pub question: String,
    pub explanation: String,
    pub photo_uri: Option<PhotoUri>,
    pub choices: Vec<ChoiceDraft>,
}

impl QuestionDraft {
    #[must_use]
    pub fn new(question: impl Into<String>, choices: Vec<ChoiceDraft>) -> Self {
        Self {
            question: question.into(),
            choices,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    /// Non-blank prompt and at least one valid choice.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.question.trim().is_empty() && self.choices.iter().any(ChoiceDraft::is_valid)
    }

    /// Gives this draft its composite identity.
    ///
    /// Invalid choices are dropped. Choice ids are derived from each choice's
    /// position in the draft, so they do not shift when a choice is filtered.
    #[must_use]
    pub fn assign_id(&self, id: QuestionId) -> Question {
        let choices = self
            .choices
            .iter()
            .zip(0_u32..)
            .filter(|(draft, _)| draft.is_valid())
            .map(|(draft, index)| Choice {
                id: ChoiceId::compose(&id, index),
                question_id: id.clone(),
                value: draft.value.clone(),
                is_answer: draft.is_answer,
            })
            .collect();

        Question {
            id,
            question: self.question.clone(),
            explanation: self.explanation.clone(),
            photo_uri: self.photo_uri.clone(),
            choices,
        }
    }
}

impl Wrap for QuestionDraft {
    fn template() -> Self {
        Self::default()
    }

    fn wrap(raw: &Value) -> Self {
        let mut out = Self::template();
        if let Some(question) = str_field(raw, "question") {
            out.question = question.to_owned();
        }
        if let Some(explanation) = str_field(raw, "explanation") {
            out.explanation = explanation.to_owned();
        }
        out.photo_uri = str_field(raw, "photoURI").and_then(PhotoUri::parse);
        if let Some(choices) = raw.get("choices") {
            out.choices = wrap_array(choices);
        }
        out
    }
}

//
// ─── COMPOSED QUESTIONS ───────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    #[serde(rename = "choiceID")]
    pub id: ChoiceId,
    #[serde(rename = "questionID")]
    pub question_id: QuestionId,
    pub value: String,
    pub is_answer: bool,
}

/// A question inside a composed quiz. Immutable once composed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "questionID")]
    pub id: QuestionId,
    pub question: String,
    pub explanation: String,
    #[serde(rename = "photoURI", default, skip_serializing_if = "Option::is_none")]
    pub photo_uri: Option<PhotoUri>,
    pub choices: Vec<Choice>,
}

impl Question {
    #[must_use]
    pub fn choice(&self, id: &ChoiceId) -> Option<&Choice> {
        self.choices.iter().find(|c| &c.id == id)
    }

    #[must_use]
    pub fn correct_choices(&self) -> impl Iterator<Item = &Choice> {
        self.choices.iter().filter(|c| c.is_answer)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
