use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for parsing identifiers from strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdError {
    #[error("failed to parse {kind} from {raw:?}")]
    Malformed { kind: &'static str, raw: String },

    #[error("quiz id cannot be empty")]
    EmptyQuizId,
}

// ─── Subject Key ───────────────────────────────────────────────────────────────

/// Position of a subject pool inside the exam content: `(module, subject)`.
///
/// Ordering is lexicographic, which gives the composer its fixed visiting order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct SubjectKey {
    pub module_index: u32,
    pub subject_index: u32,
}

impl SubjectKey {
    #[must_use]
    pub fn new(module_index: u32, subject_index: u32) -> Self {
        Self {
            module_index,
            subject_index,
        }
    }

    /// Builds the composite id of the question at `question_index` in this pool.
    #[must_use]
    pub fn question_id(&self, question_index: u32) -> QuestionId {
        QuestionId::compose(self.module_index, self.subject_index, question_index)
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.module_index, self.subject_index)
    }
}

// ─── Question Id ───────────────────────────────────────────────────────────────

/// Composite question identity: `"<moduleIndex>-<subjectIndex>-<questionIndex>"`.
///
/// Assigned once at composition and used as the only key for a question across
/// the session and result layers.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    #[must_use]
    pub fn compose(module_index: u32, subject_index: u32, question_index: u32) -> Self {
        Self(format!("{module_index}-{subject_index}-{question_index}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the id back into its `(module, subject, question)` indices.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Malformed` if the id was not built by [`QuestionId::compose`].
    pub fn parts(&self) -> Result<(u32, u32, u32), IdError> {
        parse_parts(&self.0)
    }

    /// Subject pool this question was drawn from.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Malformed` for ids that do not carry three indices.
    pub fn subject(&self) -> Result<SubjectKey, IdError> {
        let (module, subject, _) = self.parts()?;
        Ok(SubjectKey::new(module, subject))
    }
}

fn parse_parts(raw: &str) -> Result<(u32, u32, u32), IdError> {
    let malformed = || IdError::Malformed {
        kind: "QuestionId",
        raw: raw.to_owned(),
    };
    let mut it = raw.split('-').map(str::parse::<u32>);
    match (it.next(), it.next(), it.next(), it.next()) {
        (Some(Ok(m)), Some(Ok(s)), Some(Ok(q)), None) => Ok((m, s, q)),
        _ => Err(malformed()),
    }
}

impl FromStr for QuestionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (m, s, q) = parse_parts(s)?;
        Ok(Self::compose(m, s, q))
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Choice Id ─────────────────────────────────────────────────────────────────

/// Choice identity, `"<questionId>-<choiceIndex>"`.
///
/// Unique per choice even when two choices carry the same (or empty) text.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChoiceId(String);

impl ChoiceId {
    #[must_use]
    pub fn compose(question_id: &QuestionId, choice_index: u32) -> Self {
        Self(format!("{question_id}-{choice_index}"))
    }

    /// Wraps an id read back from a persisted record without re-deriving it.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ChoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChoiceId({})", self.0)
    }
}

impl fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Quiz Id ───────────────────────────────────────────────────────────────────

/// Opaque key under which finished results are kept.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuizId(String);

impl QuizId {
    /// # Errors
    ///
    /// Returns `IdError::EmptyQuizId` for blank input.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdError::EmptyQuizId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for QuizId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QuizId> for String {
    fn from(value: QuizId) -> Self {
        value.0
    }
}

impl FromStr for QuizId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuizId({})", self.0)
    }
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
