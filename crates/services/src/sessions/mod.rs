mod progress;
mod tracker;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::{Rejection, SessionError};
pub use progress::{SessionProgress, SessionSnapshot};
pub use tracker::{AnswerUpdate, SessionState, SessionTracker};
pub use view::{ResultHistoryService, ResultListItem};
pub use workflow::{QuizSession, QuizSessionService, SessionStep};
