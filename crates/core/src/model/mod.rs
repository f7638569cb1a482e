mod answer;
mod duration;
mod ids;
mod photo;
mod question;
mod result;
mod settings;

pub use ids::{ChoiceId, IdError, QuestionId, QuizId, SubjectKey};
pub use photo::PhotoUri;

pub use answer::{Answer, AnswerChange, AnswerLabel, NormalizedAnswer};
pub use duration::{DurationInfo, DurationSample, DurationStats, format_duration};
pub use question::{Choice, ChoiceDraft, Question, QuestionDraft};
pub use result::{QuizResult, ResultError, ScoreCounts};
pub use settings::{QuizSettings, SettingsError};
