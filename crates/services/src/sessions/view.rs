use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::sync::Arc;

use quiz_core::model::{
    Answer, DurationSample, DurationStats, NormalizedAnswer, Question, QuizId, QuizResult,
};
use quiz_core::wrap_array;
use storage::repository::ResultHistoryRepository;
use storage::Storage;

use crate::aggregate::aggregate;
use crate::error::HistoryError;
use crate::Clock;

/// Presentation-agnostic list item for a stored quiz result.
///
/// No pre-formatted strings: the UI formats times and durations itself
/// (see `quiz_core::model::format_duration`).
#[derive(Debug, Clone, PartialEq)]
pub struct ResultListItem {
    /// Position in the quiz's history, oldest first.
    pub index: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    pub correct: u32,
    pub incorrect: u32,
    pub unanswered: u32,
    pub total: u32,
    pub score_percent: Option<f64>,
    pub duration_stats: DurationStats,
}

impl ResultListItem {
    #[must_use]
    pub fn from_result(index: usize, result: &QuizResult) -> Self {
        Self {
            index,
            start_time: result.start_time(),
            end_time: result.end_time(),
            correct: result.correct(),
            incorrect: result.incorrect(),
            unanswered: result.unanswered(),
            total: result.total(),
            score_percent: result.score_percent(),
            duration_stats: result.duration_stats(),
        }
    }
}

/// Read side of the result history.
///
/// Owns the time source and repository access so the UI does neither.
#[derive(Clone)]
pub struct ResultHistoryService {
    clock: Clock,
    results: Arc<dyn ResultHistoryRepository>,
}

impl ResultHistoryService {
    #[must_use]
    pub fn new(clock: Clock, results: Arc<dyn ResultHistoryRepository>) -> Self {
        Self { clock, results }
    }

    #[must_use]
    pub fn in_memory(clock: Clock, history_limit: usize) -> Self {
        Self::new(clock, Storage::in_memory(history_limit).results)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Up to `limit` results, newest first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn list_recent(
        &self,
        quiz_id: &QuizId,
        limit: usize,
    ) -> Result<Vec<ResultListItem>, HistoryError> {
        let results = self.results.list_results(quiz_id).await?;
        Ok(results
            .iter()
            .enumerate()
            .rev()
            .take(limit)
            .map(|(index, result)| ResultListItem::from_result(index, result))
            .collect())
    }

    /// Results that ended within the last `days` days, newest first.
    ///
    /// Results without an end time are left out.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn list_within_days(
        &self,
        quiz_id: &QuizId,
        days: i64,
    ) -> Result<Vec<ResultListItem>, HistoryError> {
        let since = self.clock.now() - Duration::days(days);
        let results = self.results.list_results(quiz_id).await?;
        Ok(results
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, r)| r.end_time().is_some_and(|end| end >= since))
            .map(|(index, result)| ResultListItem::from_result(index, result))
            .collect())
    }

    /// The most recent result, if any.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn latest(&self, quiz_id: &QuizId) -> Result<Option<QuizResult>, HistoryError> {
        Ok(self.results.list_results(quiz_id).await?.pop())
    }

    /// Drop every stored result for a quiz.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn clear(&self, quiz_id: &QuizId) -> Result<(), HistoryError> {
        self.results.clear_results(quiz_id).await?;
        Ok(())
    }

    /// Re-derive a result from externally stored answer records.
    ///
    /// `raw_answers` is expected to be a JSON array of answer records. Records
    /// that do not belong to any of `questions`, or that name a choice the
    /// question lacks, are ignored.
    #[must_use]
    pub fn rederive(
        questions: &[Question],
        raw_answers: &Value,
        durations: &[DurationSample],
    ) -> QuizResult {
        let answers: Vec<Answer> = wrap_array::<NormalizedAnswer>(raw_answers)
            .iter()
            .filter_map(|raw| {
                let question = questions.iter().find(|q| raw.matches(q))?;
                raw.rehydrate(question)
            })
            .collect();
        aggregate(questions, &answers, durations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use quiz_core::model::{ChoiceDraft, QuestionDraft, QuestionId, ScoreCounts};
    use quiz_core::time::fixed_now;
    use serde_json::json;

    fn result_at(end: DateTime<Utc>, correct: u32) -> QuizResult {
        let counts = ScoreCounts {
            correct,
            incorrect: 0,
            unanswered: 1,
        };
        QuizResult::new(counts, DurationStats::Unavailable, Some(end), Some(end)).unwrap()
    }

    fn questions() -> Vec<Question> {
        (0..3)
            .map(|i| {
                QuestionDraft::new(
                    format!("Q{i}"),
                    vec![ChoiceDraft::new("yes", true), ChoiceDraft::new("no", false)],
                )
                .assign_id(QuestionId::compose(1, 0, i))
            })
            .collect()
    }

    #[test]
    fn list_item_is_presentation_agnostic() {
        let now = fixed_now();
        let item = ResultListItem::from_result(3, &result_at(now, 3));
        assert_eq!(item.index, 3);
        assert_eq!(item.end_time, Some(now));
        assert_eq!(item.total, 4);
        assert_eq!(item.score_percent, Some(75.0));
        assert!(!item.duration_stats.is_available());
    }

    #[tokio::test]
    async fn list_recent_is_newest_first_and_limited() {
        let storage = Storage::in_memory(10);
        let quiz = QuizId::new("q").unwrap();
        let now = fixed_now();
        for correct in 0..4 {
            storage
                .results
                .append_result(&quiz, &result_at(now, correct))
                .await
                .unwrap();
        }

        let svc = ResultHistoryService::new(Clock::Fixed(now), storage.results.clone());
        let items = svc.list_recent(&quiz, 2).await.unwrap();
        let correct: Vec<u32> = items.iter().map(|i| i.correct).collect();
        assert_eq!(correct, vec![3, 2]);
        assert_eq!(items[0].index, 3);

        assert_eq!(svc.latest(&quiz).await.unwrap().unwrap().correct(), 3);
        svc.clear(&quiz).await.unwrap();
        assert!(svc.latest(&quiz).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_within_days_filters_by_end_time() {
        let storage = Storage::in_memory(10);
        let quiz = QuizId::new("q").unwrap();
        let now = fixed_now();
        let old = result_at(now - Duration::days(10), 1);
        let recent = result_at(now - Duration::days(1), 2);
        storage.results.append_result(&quiz, &old).await.unwrap();
        storage.results.append_result(&quiz, &recent).await.unwrap();

        let svc = ResultHistoryService::new(Clock::Fixed(now), storage.results.clone());
        let items = svc.list_within_days(&quiz, 7).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].correct, 2);
        assert_eq!(items[0].index, 1);
    }

    #[test]
    fn rederive_trusts_choices_not_stored_flags() {
        let qs = questions();
        let raw = json!([
            {
                "answerID": "1-0-0-0",
                "questionID": "1-0-0",
                "isCorrect": false,
                "label": "NONE",
                "timestamp": 1_700_000_000_000_i64,
                "selectedChoice": { "choiceID": "1-0-0-0" }
            },
            {
                "answerID": "1-0-1-1",
                "questionID": "1-0-1",
                "isCorrect": true,
                "selectedChoice": { "choiceID": "1-0-1-1" }
            },
            { "questionID": "9-9-9", "selectedChoice": { "choiceID": "9-9-9-0" } },
            { "questionID": "", "isCorrect": true },
            "not an object"
        ]);

        let result = ResultHistoryService::rederive(&qs, &raw, &[]);
        assert_eq!(result.correct(), 1);
        assert_eq!(result.incorrect(), 1);
        assert_eq!(result.unanswered(), 1);
        assert_eq!(result.total(), 3);
    }

    #[test]
    fn rederive_of_non_array_scores_everything_unanswered() {
        let qs = questions();
        let result = ResultHistoryService::rederive(&qs, &json!({"oops": true}), &[]);
        assert_eq!(result.unanswered(), 3);
    }
}
