//! Joins questions, answers and durations into a scored result.
//!
//! Everything here is a pure function of its inputs, so a result can be
//! re-derived later from the same logs and will compare equal.

use std::collections::BTreeMap;

use quiz_core::model::{
    Answer, AnswerLabel, DurationInfo, DurationSample, DurationStats, Question, QuestionId,
    QuizResult, ScoreCounts,
};

/// One question of a finished session with everything recorded for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionAnswerRecord {
    pub question: Question,
    pub answer: Option<Answer>,
    /// True when an answer with a selected choice exists for the question.
    pub has_matched_answer: bool,
    pub duration: DurationInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Correct,
    Incorrect,
    Unanswered,
}

impl QuestionAnswerRecord {
    #[must_use]
    pub fn status(&self) -> RecordStatus {
        match &self.answer {
            Some(answer) if self.has_matched_answer && answer.is_correct => RecordStatus::Correct,
            Some(_) if self.has_matched_answer => RecordStatus::Incorrect,
            _ => RecordStatus::Unanswered,
        }
    }

    #[must_use]
    pub fn is_marked(&self) -> bool {
        self.answer
            .as_ref()
            .is_some_and(|a| a.label == AnswerLabel::Marked)
    }
}

/// Which records a review screen wants to walk through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewFilter {
    #[default]
    All,
    Incorrect,
    Unanswered,
    Marked,
}

/// Total time and visit count per question.
///
/// Samples for questions outside `questions` are ignored.
#[must_use]
pub fn rollup_durations(
    questions: &[Question],
    durations: &[DurationSample],
) -> BTreeMap<QuestionId, DurationInfo> {
    let mut rollup: BTreeMap<QuestionId, DurationInfo> = questions
        .iter()
        .map(|q| (q.id.clone(), DurationInfo::default()))
        .collect();
    for sample in durations {
        if let Some(info) = rollup.get_mut(&sample.question_id) {
            info.add(sample.duration_ms.max(0));
        }
    }
    rollup
}

/// Pairs every question with its answer and duration rollup, in question order.
///
/// When `answers` holds several entries for one question the last one wins.
#[must_use]
pub fn join_records(
    questions: &[Question],
    answers: &[Answer],
    durations: &[DurationSample],
) -> Vec<QuestionAnswerRecord> {
    let by_question: BTreeMap<&QuestionId, &Answer> =
        answers.iter().map(|a| (&a.question_id, a)).collect();
    let rollup = rollup_durations(questions, durations);

    questions
        .iter()
        .map(|question| {
            let answer = by_question.get(&question.id).map(|a| (*a).clone());
            QuestionAnswerRecord {
                has_matched_answer: answer.as_ref().is_some_and(Answer::has_selection),
                duration: rollup.get(&question.id).copied().unwrap_or_default(),
                question: question.clone(),
                answer,
            }
        })
        .collect()
}

/// Tallies correct, incorrect and unanswered records.
#[must_use]
pub fn score(records: &[QuestionAnswerRecord]) -> ScoreCounts {
    records
        .iter()
        .fold(ScoreCounts::default(), |mut counts, record| {
            match record.status() {
                RecordStatus::Correct => counts.correct = counts.correct.saturating_add(1),
                RecordStatus::Incorrect => counts.incorrect = counts.incorrect.saturating_add(1),
                RecordStatus::Unanswered => {
                    counts.unanswered = counts.unanswered.saturating_add(1);
                }
            }
            counts
        })
}

/// Scores a session.
///
/// Counts come from the joined records; timing statistics come from the raw
/// samples, not the per-question rollups. The time range spans the earliest
/// and latest recorded event.
#[must_use]
pub fn aggregate(
    questions: &[Question],
    answers: &[Answer],
    durations: &[DurationSample],
) -> QuizResult {
    let records = join_records(questions, answers, durations);
    let counts = score(&records);
    let stats = DurationStats::from_durations(durations.iter().map(|d| d.duration_ms.max(0)));
    let events = answers
        .iter()
        .map(|a| a.timestamp)
        .chain(durations.iter().map(|d| d.timestamp));
    QuizResult::from_events(counts, stats, events)
}

/// Selects the records a review screen should show.
#[must_use]
pub fn review_records(
    records: &[QuestionAnswerRecord],
    filter: ReviewFilter,
) -> Vec<&QuestionAnswerRecord> {
    records
        .iter()
        .filter(|r| match filter {
            ReviewFilter::All => true,
            ReviewFilter::Incorrect => r.status() == RecordStatus::Incorrect,
            ReviewFilter::Unanswered => r.status() == RecordStatus::Unanswered,
            ReviewFilter::Marked => r.is_marked(),
        })
        .collect()
}
