#![forbid(unsafe_code)]

pub mod aggregate;
pub mod composer;
pub mod error;
pub mod sessions;

pub use quiz_core::Clock;

pub use aggregate::{
    QuestionAnswerRecord, RecordStatus, ReviewFilter, aggregate, join_records, review_records,
};
pub use composer::{ComposedQuiz, QuizComposer, SubjectPools, compose_quiz};
pub use error::{HistoryError, Rejection, SessionError};

pub use sessions::{
    AnswerUpdate, QuizSession, QuizSessionService, ResultHistoryService, ResultListItem,
    SessionProgress, SessionSnapshot, SessionStep, SessionTracker,
};
