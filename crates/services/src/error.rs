//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{ChoiceId, QuestionId, ResultError};
use storage::StorageError;

/// Why the session tracker refused an operation.
///
/// A rejection never changes session state. It is logged and handed back to
/// the caller, which is free to ignore it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Rejection {
    #[error("question {0} is not part of this session")]
    UnknownQuestion(QuestionId),

    #[error("question {0} has not been revealed yet")]
    NotRevealed(QuestionId),

    #[error("only the question at the reveal frontier can be skipped, not {0}")]
    NotAtFrontier(QuestionId),

    #[error("question {0} was already skipped")]
    AlreadySkipped(QuestionId),

    #[error("an answer for {0} needs a selected choice")]
    MissingChoice(QuestionId),

    #[error("choice {choice} does not belong to question {question}")]
    ForeignChoice {
        question: QuestionId,
        choice: ChoiceId,
    },

    #[error("no revealed question at index {index} with id {question}")]
    IndexMismatch { index: usize, question: QuestionId },

    #[error("no revealed question at index {0}")]
    OutOfRange(usize),

    #[error("no questions left to reveal")]
    NothingToReveal,

    #[error("session already finished")]
    Finished,
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session is not complete yet")]
    NotComplete,
    #[error("choice {choice} is not offered by question {question}")]
    UnknownChoice {
        question: QuestionId,
        choice: ChoiceId,
    },
    #[error(transparent)]
    Result(#[from] ResultError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ResultHistoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}
