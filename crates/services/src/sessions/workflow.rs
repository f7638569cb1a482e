use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use quiz_core::model::{
    AnswerChange, AnswerLabel, Choice, ChoiceId, DurationSample, QuestionId, QuizId, QuizResult,
    QuizSettings, SubjectKey,
};
use storage::repository::ResultHistoryRepository;
use storage::Storage;

use super::progress::{SessionProgress, SessionSnapshot};
use super::tracker::{AnswerUpdate, SessionTracker};
use crate::composer::{QuizComposer, SubjectPools};
use crate::error::{Rejection, SessionError};
use crate::Clock;

/// A running quiz: the tracker plus the bookkeeping needed to persist its result.
#[derive(Debug)]
pub struct QuizSession {
    quiz_id: QuizId,
    tracker: SessionTracker,
    per_subject: BTreeMap<SubjectKey, usize>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    result: Option<QuizResult>,
    history_index: Option<usize>,
}

impl QuizSession {
    #[must_use]
    pub fn quiz_id(&self) -> &QuizId {
        &self.quiz_id
    }

    #[must_use]
    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Questions drawn from each subject.
    #[must_use]
    pub fn per_subject(&self) -> &BTreeMap<SubjectKey, usize> {
        &self.per_subject
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// The scored result once the session has finished.
    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    /// Position of the result in the quiz's history once persisted.
    #[must_use]
    pub fn history_index(&self) -> Option<usize> {
        self.history_index
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        self.tracker.progress()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.tracker.snapshot()
    }
}

/// Outcome of one user event applied through the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStep {
    /// The tracker's verdict. A rejection left the session unchanged.
    pub outcome: Result<AnswerUpdate, Rejection>,
    /// Question revealed as a consequence of the event.
    pub revealed: Option<QuestionId>,
    pub is_complete: bool,
    pub history_index: Option<usize>,
}

/// Orchestrates compose, take, record and persist for quiz sessions.
#[derive(Clone)]
pub struct QuizSessionService {
    clock: Clock,
    settings: QuizSettings,
    results: Arc<dyn ResultHistoryRepository>,
    seed: Option<u64>,
}

impl QuizSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: QuizSettings,
        results: Arc<dyn ResultHistoryRepository>,
    ) -> Self {
        Self {
            clock,
            settings,
            results,
            seed: None,
        }
    }

    /// Service over an in-memory blob store sized by the settings' history limit.
    #[must_use]
    pub fn in_memory(clock: Clock, settings: QuizSettings) -> Self {
        let limit = usize::try_from(settings.history_limit()).unwrap_or(usize::MAX);
        let storage = Storage::in_memory(limit);
        Self::new(clock, settings, storage.results)
    }

    /// Compose every quiz with the same seed, for reproducible sessions.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn results(&self) -> Arc<dyn ResultHistoryRepository> {
        Arc::clone(&self.results)
    }

    /// Mutable access to the time source, e.g. to advance a fixed clock.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Compose a quiz from `pools` and start a session on it.
    ///
    /// The first question is revealed and its viewing interval starts now.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no valid question could be drawn.
    pub fn start(&self, quiz_id: QuizId, pools: &SubjectPools) -> Result<QuizSession, SessionError> {
        let composer = QuizComposer::new(&self.settings);
        let composed = match self.seed {
            Some(seed) => composer.compose_with_seed(pools, seed),
            None => composer.compose(pools),
        };

        let now = self.clock.now();
        let mut tracker = SessionTracker::new(composed.questions)?;
        if let Some(first) = tracker.frontier().map(|q| q.id.clone()) {
            tracker.record_duration(0, &first, now).ok();
        }

        tracing::debug!(
            quiz = %quiz_id,
            total = tracker.state().total(),
            "session started"
        );

        Ok(QuizSession {
            quiz_id,
            tracker,
            per_subject: composed.per_subject,
            started_at: now,
            completed_at: None,
            result: None,
            history_index: None,
        })
    }

    /// Select `choice_id` for a revealed question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownChoice` if the question does not offer
    /// the choice, or `SessionError::Storage` if the final result cannot be
    /// persisted. Tracker rejections are reported in `SessionStep::outcome`.
    pub async fn answer(
        &self,
        session: &mut QuizSession,
        question_id: &QuestionId,
        choice_id: &ChoiceId,
    ) -> Result<SessionStep, SessionError> {
        if session.is_complete() {
            return Ok(finished_step(session));
        }
        let now = self.clock.now();
        let choice = resolve_choice(session, question_id, Some(choice_id))?;
        let outcome =
            session
                .tracker
                .record_answer(question_id, choice.as_ref(), AnswerLabel::None, now);
        self.advance(session, outcome, true, now).await
    }

    /// Skip the frontier question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the final result cannot be persisted.
    pub async fn skip(
        &self,
        session: &mut QuizSession,
        question_id: &QuestionId,
    ) -> Result<SessionStep, SessionError> {
        if session.is_complete() {
            return Ok(finished_step(session));
        }
        let now = self.clock.now();
        let outcome = session.tracker.skip(question_id, now);
        self.advance(session, outcome, true, now).await
    }

    /// Toggle the bookmark on a revealed question.
    ///
    /// # Errors
    ///
    /// Same conditions as [`QuizSessionService::answer`].
    pub async fn toggle_mark(
        &self,
        session: &mut QuizSession,
        question_id: &QuestionId,
        choice_id: Option<&ChoiceId>,
    ) -> Result<SessionStep, SessionError> {
        if session.is_complete() {
            return Ok(finished_step(session));
        }
        let now = self.clock.now();
        let choice = resolve_choice(session, question_id, choice_id)?;
        let outcome = session
            .tracker
            .toggle_mark(question_id, choice.as_ref(), now);
        self.advance(session, outcome, false, now).await
    }

    /// Move to the revealed question at `index`, closing the previous
    /// question's viewing interval.
    ///
    /// # Errors
    ///
    /// Returns `Rejection::OutOfRange` for an index past the revealed
    /// questions and `Rejection::Finished` once the session is complete.
    pub fn navigate(
        &self,
        session: &mut QuizSession,
        index: usize,
    ) -> Result<Option<DurationSample>, Rejection> {
        if session.is_complete() {
            tracing::warn!(quiz = %session.quiz_id, "navigation after session end");
            return Err(Rejection::Finished);
        }
        let Some(question_id) = session
            .tracker
            .state()
            .visible()
            .get(index)
            .map(|q| q.id.clone())
        else {
            tracing::warn!(index, "navigation past the revealed questions");
            return Err(Rejection::OutOfRange(index));
        };
        session
            .tracker
            .record_duration(index, &question_id, self.clock.now())
    }

    /// Retry result persistence after a completed session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotComplete` if the session has not finished.
    /// Returns `SessionError::Storage` if persistence fails.
    pub async fn finalize(&self, session: &mut QuizSession) -> Result<usize, SessionError> {
        if let Some(index) = session.history_index {
            return Ok(index);
        }
        let Some(result) = session.result.clone() else {
            return Err(SessionError::NotComplete);
        };
        let index = self.results.append_result(&session.quiz_id, &result).await?;
        session.history_index = Some(index);
        tracing::info!(quiz = %session.quiz_id, index, "quiz result persisted");
        Ok(index)
    }

    async fn advance(
        &self,
        session: &mut QuizSession,
        outcome: Result<AnswerUpdate, Rejection>,
        reveals: bool,
        now: DateTime<Utc>,
    ) -> Result<SessionStep, SessionError> {
        let mut revealed = None;
        if let Ok(update) = &outcome {
            let moves_on = reveals
                && update.at_frontier
                && !update.is_last_question
                && matches!(update.change, AnswerChange::Inserted | AnswerChange::Replaced);
            if moves_on {
                revealed = session.tracker.reveal_next().ok().map(|q| q.id.clone());
            }
        }
        if let Some(id) = &revealed {
            let index = session.tracker.state().visible().len() - 1;
            session.tracker.record_duration(index, id, now).ok();
        }

        if !session.is_complete() && session.tracker.is_complete() {
            session.tracker.close_interval(now);
            let end = now.max(session.started_at);
            let result = session
                .tracker
                .result()
                .with_time_range(session.started_at, end)?;
            session.completed_at = Some(end);
            session.result = Some(result);
            self.finalize(session).await?;
        }

        Ok(SessionStep {
            outcome,
            revealed,
            is_complete: session.is_complete(),
            history_index: session.history_index,
        })
    }
}

fn finished_step(session: &QuizSession) -> SessionStep {
    tracing::warn!(quiz = %session.quiz_id, "event after session end");
    SessionStep {
        outcome: Err(Rejection::Finished),
        revealed: None,
        is_complete: true,
        history_index: session.history_index,
    }
}

/// Looks up `choice_id` on a revealed question. Unrevealed or unknown questions
/// resolve to no choice so the tracker reports the precise rejection.
fn resolve_choice(
    session: &QuizSession,
    question_id: &QuestionId,
    choice_id: Option<&ChoiceId>,
) -> Result<Option<Choice>, SessionError> {
    let (Some(question), Some(choice_id)) = (session.tracker.question(question_id), choice_id)
    else {
        return Ok(None);
    };
    question
        .choice(choice_id)
        .cloned()
        .map(Some)
        .ok_or_else(|| SessionError::UnknownChoice {
            question: question_id.clone(),
            choice: choice_id.clone(),
        })
}
