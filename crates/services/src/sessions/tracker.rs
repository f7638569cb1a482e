use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

use quiz_core::model::{
    Answer, AnswerChange, AnswerLabel, Choice, DurationSample, Question, QuestionId, QuizResult,
};
use quiz_core::time::elapsed_ms;

use super::progress::{SessionProgress, SessionSnapshot};
use crate::aggregate::aggregate;
use crate::error::{Rejection, SessionError};

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Everything one running session owns.
///
/// `visible` is always a prefix of the composed question list and `remaining`
/// the rest of it, stored reversed so the next question pops off the end.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    remaining: Vec<Question>,
    visible: Vec<Question>,
    answers: BTreeMap<QuestionId, Answer>,
    durations: Vec<DurationSample>,
}

impl SessionState {
    #[must_use]
    pub fn visible(&self) -> &[Question] {
        &self.visible
    }

    #[must_use]
    pub fn remaining_len(&self) -> usize {
        self.remaining.len()
    }

    /// Number of questions in the composed quiz.
    #[must_use]
    pub fn total(&self) -> usize {
        self.visible.len() + self.remaining.len()
    }

    #[must_use]
    pub fn answer(&self, question_id: &QuestionId) -> Option<&Answer> {
        self.answers.get(question_id)
    }

    /// Answers ordered by question id.
    pub fn answers(&self) -> impl Iterator<Item = &Answer> {
        self.answers.values()
    }

    #[must_use]
    pub fn answer_log(&self) -> Vec<Answer> {
        self.answers.values().cloned().collect()
    }

    #[must_use]
    pub fn durations(&self) -> &[DurationSample] {
        &self.durations
    }
}

//
// ─── TRACKER ───────────────────────────────────────────────────────────────────
//

/// Outcome of a recorded answer, skip or mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerUpdate {
    pub question_id: QuestionId,
    pub change: AnswerChange,
    /// The question was the last revealed one when the record was applied.
    pub at_frontier: bool,
    /// The question is the final one of the composed quiz.
    pub is_last_question: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Baseline {
    index: usize,
    question_id: QuestionId,
    at: DateTime<Utc>,
}

/// Drives one session through answer, skip, mark, reveal and navigation events.
///
/// Events are applied in the order they arrive. Invalid events are rejected
/// without touching the state so the session stays usable.
pub struct SessionTracker {
    state: SessionState,
    last_question: QuestionId,
    baseline: Option<Baseline>,
    /// Entry held before the question was marked; `None` when it had none.
    /// Unmarking restores it.
    before_mark: BTreeMap<QuestionId, Option<Answer>>,
}

fn log_rejection(rejection: &Rejection) {
    tracing::warn!(%rejection, "session event rejected");
}

impl SessionTracker {
    /// Start tracking a composed quiz with its first question revealed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are provided.
    pub fn new(questions: Vec<Question>) -> Result<Self, SessionError> {
        let mut remaining = questions;
        let Some(last_question) = remaining.last().map(|q| q.id.clone()) else {
            return Err(SessionError::Empty);
        };
        remaining.reverse();
        let Some(first) = remaining.pop() else {
            return Err(SessionError::Empty);
        };

        Ok(Self {
            state: SessionState {
                remaining,
                visible: vec![first],
                answers: BTreeMap::new(),
                durations: Vec::new(),
            },
            last_question,
            baseline: None,
            before_mark: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The last revealed question: the only one that may be skipped.
    #[must_use]
    pub fn frontier(&self) -> Option<&Question> {
        self.state.visible.last()
    }

    /// A revealed question by id.
    #[must_use]
    pub fn question(&self, question_id: &QuestionId) -> Option<&Question> {
        self.state.visible.iter().find(|q| &q.id == question_id)
    }

    /// Reveal the next question.
    ///
    /// # Errors
    ///
    /// Returns `Rejection::NothingToReveal` once every question is visible.
    pub fn reveal_next(&mut self) -> Result<&Question, Rejection> {
        let Some(next) = self.state.remaining.pop() else {
            let rejection = Rejection::NothingToReveal;
            log_rejection(&rejection);
            return Err(rejection);
        };
        self.state.visible.push(next);
        let index = self.state.visible.len() - 1;
        Ok(&self.state.visible[index])
    }

    /// Record a selection, skip, or mark for a revealed question.
    ///
    /// - `None` needs a choice and replaces any previous answer.
    /// - `Marked` toggles the mark, keeping a previously selected choice.
    /// - `Skipped` ignores `choice` and only applies to the reveal frontier.
    ///
    /// # Errors
    ///
    /// Returns a `Rejection` and leaves the state unchanged when the question
    /// is not revealed, the choice belongs elsewhere, or a skip is not allowed.
    pub fn record_answer(
        &mut self,
        question_id: &QuestionId,
        choice: Option<&Choice>,
        label: AnswerLabel,
        at: DateTime<Utc>,
    ) -> Result<AnswerUpdate, Rejection> {
        self.apply_record(question_id, choice, label, at)
            .inspect_err(log_rejection)
    }

    /// Select `choice` for its question.
    ///
    /// # Errors
    ///
    /// See [`SessionTracker::record_answer`].
    pub fn select(&mut self, choice: &Choice, at: DateTime<Utc>) -> Result<AnswerUpdate, Rejection> {
        self.record_answer(&choice.question_id, Some(choice), AnswerLabel::None, at)
    }

    /// Skip the frontier question.
    ///
    /// # Errors
    ///
    /// Returns `Rejection::NotAtFrontier` for any other question and
    /// `Rejection::AlreadySkipped` for a repeated skip.
    pub fn skip(
        &mut self,
        question_id: &QuestionId,
        at: DateTime<Utc>,
    ) -> Result<AnswerUpdate, Rejection> {
        self.record_answer(question_id, None, AnswerLabel::Skipped, at)
    }

    /// Mark or unmark a question, optionally with the choice currently shown
    /// as selected.
    ///
    /// Unmarking puts the entry back exactly as it was before the mark, so a
    /// question that had no entry is left without one.
    ///
    /// # Errors
    ///
    /// See [`SessionTracker::record_answer`].
    pub fn toggle_mark(
        &mut self,
        question_id: &QuestionId,
        choice: Option<&Choice>,
        at: DateTime<Utc>,
    ) -> Result<AnswerUpdate, Rejection> {
        self.record_answer(question_id, choice, AnswerLabel::Marked, at)
    }

    fn locate(&self, question_id: &QuestionId) -> Result<usize, Rejection> {
        if let Some(position) = self.state.visible.iter().position(|q| &q.id == question_id) {
            return Ok(position);
        }
        if self.state.remaining.iter().any(|q| &q.id == question_id) {
            Err(Rejection::NotRevealed(question_id.clone()))
        } else {
            Err(Rejection::UnknownQuestion(question_id.clone()))
        }
    }

    fn apply_record(
        &mut self,
        question_id: &QuestionId,
        choice: Option<&Choice>,
        label: AnswerLabel,
        at: DateTime<Utc>,
    ) -> Result<AnswerUpdate, Rejection> {
        let position = self.locate(question_id)?;
        let at_frontier = position + 1 == self.state.visible.len();

        if let Some(choice) = choice {
            let owned = &choice.question_id == question_id
                && self.state.visible[position].choice(&choice.id).is_some();
            if !owned {
                return Err(Rejection::ForeignChoice {
                    question: question_id.clone(),
                    choice: choice.id.clone(),
                });
            }
        }

        let existing = self.state.answers.get(question_id);
        let selection = match label {
            AnswerLabel::Skipped => {
                if !at_frontier {
                    return Err(Rejection::NotAtFrontier(question_id.clone()));
                }
                if existing.is_some_and(|a| a.label == AnswerLabel::Skipped) {
                    return Err(Rejection::AlreadySkipped(question_id.clone()));
                }
                None
            }
            AnswerLabel::None => Some(
                choice
                    .ok_or_else(|| Rejection::MissingChoice(question_id.clone()))?
                    .clone(),
            ),
            AnswerLabel::Marked => choice.cloned(),
        };

        let previous = existing.cloned();
        let incoming = Answer::new(question_id.clone(), selection, label, at);
        let (stored, change) = Answer::merge(previous.as_ref(), incoming);

        match change {
            AnswerChange::Unmarked => match self.before_mark.remove(question_id) {
                Some(Some(restored)) => {
                    self.state.answers.insert(question_id.clone(), restored);
                }
                Some(None) => {
                    self.state.answers.remove(question_id);
                }
                None => {
                    self.state.answers.insert(question_id.clone(), stored);
                }
            },
            AnswerChange::Marked | AnswerChange::Inserted if label == AnswerLabel::Marked => {
                self.before_mark.insert(question_id.clone(), previous);
                self.state.answers.insert(question_id.clone(), stored);
            }
            AnswerChange::Inserted | AnswerChange::Replaced | AnswerChange::Marked => {
                self.before_mark.remove(question_id);
                self.state.answers.insert(question_id.clone(), stored);
            }
        }

        Ok(AnswerUpdate {
            question_id: question_id.clone(),
            change,
            at_frontier,
            is_last_question: question_id == &self.last_question,
        })
    }

    /// Navigation to the revealed question at `index`.
    ///
    /// The first call only sets the baseline. Each later call closes the
    /// interval of the previously active question and returns its sample.
    ///
    /// # Errors
    ///
    /// Returns `Rejection::IndexMismatch` if `index` does not hold `question_id`.
    pub fn record_duration(
        &mut self,
        index: usize,
        question_id: &QuestionId,
        at: DateTime<Utc>,
    ) -> Result<Option<DurationSample>, Rejection> {
        let matches = self
            .state
            .visible
            .get(index)
            .is_some_and(|q| &q.id == question_id);
        if !matches {
            let rejection = Rejection::IndexMismatch {
                index,
                question: question_id.clone(),
            };
            log_rejection(&rejection);
            return Err(rejection);
        }

        let sample = self.close_interval(at);
        self.baseline = Some(Baseline {
            index,
            question_id: question_id.clone(),
            at,
        });
        Ok(sample)
    }

    /// Close the active interval without starting a new one, e.g. when the
    /// session ends on its last question.
    pub fn close_interval(&mut self, at: DateTime<Utc>) -> Option<DurationSample> {
        let prev = self.baseline.take()?;
        if at < prev.at {
            tracing::warn!(
                question = %prev.question_id,
                "navigation timestamp went backwards, recording zero duration"
            );
        }
        let sample = DurationSample {
            question_id: prev.question_id,
            index: prev.index,
            timestamp: at,
            duration_ms: elapsed_ms(prev.at, at),
        };
        self.state.durations.push(sample.clone());
        Some(sample)
    }

    /// Every question revealed and recorded in the answer log.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.remaining.is_empty()
            && self
                .state
                .visible
                .iter()
                .all(|q| self.state.answers.contains_key(&q.id))
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let count = |label| {
            self.state
                .answers
                .values()
                .filter(|a| a.label == label)
                .count()
        };
        SessionProgress {
            total: self.state.total(),
            revealed: self.state.visible.len(),
            answered: self.state.answers.values().filter(|a| a.has_selection()).count(),
            skipped: count(AnswerLabel::Skipped),
            marked: count(AnswerLabel::Marked),
            remaining: self.state.remaining.len(),
            is_complete: self.is_complete(),
        }
    }

    /// Marked questions in reveal order.
    #[must_use]
    pub fn marked_questions(&self) -> Vec<&QuestionId> {
        self.state
            .visible
            .iter()
            .filter(|q| {
                self.state
                    .answers
                    .get(&q.id)
                    .is_some_and(|a| a.label == AnswerLabel::Marked)
            })
            .map(|q| &q.id)
            .collect()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            visible: self.state.visible.clone(),
            remaining: self.state.remaining.len(),
            answers: self.state.answer_log(),
            durations: self.state.durations.clone(),
            frontier: self.frontier().map(|q| q.id.clone()),
        }
    }

    /// Score the revealed questions against the logs recorded so far.
    #[must_use]
    pub fn result(&self) -> QuizResult {
        aggregate(
            &self.state.visible,
            &self.state.answer_log(),
            &self.state.durations,
        )
    }
}

impl fmt::Debug for SessionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTracker")
            .field("visible_len", &self.state.visible.len())
            .field("remaining_len", &self.state.remaining.len())
            .field("answers_len", &self.state.answers.len())
            .field("durations_len", &self.state.durations.len())
            .field("last_question", &self.last_question)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
