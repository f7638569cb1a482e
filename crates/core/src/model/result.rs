use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::duration::DurationStats;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("end time is before start time")]
    InvalidTimeRange,

    #[error("total ({total}) does not match score counts ({sum})")]
    CountMismatch { total: u32, sum: u64 },
}

/// Correct/incorrect/unanswered tally of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreCounts {
    pub correct: u32,
    pub incorrect: u32,
    pub unanswered: u32,
}

impl ScoreCounts {
    /// Sum of the three counts, saturating at `u32::MAX`.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.correct
            .saturating_add(self.incorrect)
            .saturating_add(self.unanswered)
    }

    /// Exact sum of the three counts. Persisted records may hold counts whose
    /// sum does not fit in `u32`.
    #[must_use]
    pub fn sum(&self) -> u64 {
        u64::from(self.correct) + u64::from(self.incorrect) + u64::from(self.unanswered)
    }
}

/// Scored outcome of a finished session.
///
/// Once built a result is never mutated; it is appended to the quiz's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    #[serde(with = "chrono::serde::ts_milliseconds_option", default)]
    start_time: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds_option", default)]
    end_time: Option<DateTime<Utc>>,
    correct: u32,
    incorrect: u32,
    unanswered: u32,
    total: u32,
    duration_stats: DurationStats,
}

impl QuizResult {
    /// # Errors
    ///
    /// Returns `ResultError::InvalidTimeRange` if both times are set and the end
    /// precedes the start.
    pub fn new(
        counts: ScoreCounts,
        duration_stats: DurationStats,
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
    ) -> Result<Self, ResultError> {
        check_range(start_time, end_time)?;
        Ok(Self {
            start_time,
            end_time,
            correct: counts.correct,
            incorrect: counts.incorrect,
            unanswered: counts.unanswered,
            total: counts.total(),
            duration_stats,
        })
    }

    /// Builds a result whose time range spans the given event timestamps.
    ///
    /// With no events both ends are absent.
    #[must_use]
    pub fn from_events(
        counts: ScoreCounts,
        duration_stats: DurationStats,
        events: impl IntoIterator<Item = DateTime<Utc>>,
    ) -> Self {
        let mut start_time: Option<DateTime<Utc>> = None;
        let mut end_time: Option<DateTime<Utc>> = None;
        for t in events {
            start_time = Some(start_time.map_or(t, |s| s.min(t)));
            end_time = Some(end_time.map_or(t, |e| e.max(t)));
        }
        Self {
            start_time,
            end_time,
            correct: counts.correct,
            incorrect: counts.incorrect,
            unanswered: counts.unanswered,
            total: counts.total(),
            duration_stats,
        }
    }

    /// Rehydrate a result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::CountMismatch` if the counts do not add up to `total`,
    /// or `ResultError::InvalidTimeRange` for an inverted time range.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        correct: u32,
        incorrect: u32,
        unanswered: u32,
        total: u32,
        duration_stats: DurationStats,
    ) -> Result<Self, ResultError> {
        let counts = ScoreCounts {
            correct,
            incorrect,
            unanswered,
        };
        let sum = counts.sum();
        if sum != u64::from(total) {
            return Err(ResultError::CountMismatch { total, sum });
        }
        Self::new(counts, duration_stats, start_time, end_time)
    }

    /// Replaces the derived time range with the session's real start and end.
    ///
    /// # Errors
    ///
    /// Returns `ResultError::InvalidTimeRange` if `end` is before `start`.
    pub fn with_time_range(
        self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, ResultError> {
        check_range(Some(start), Some(end))?;
        Ok(Self {
            start_time: Some(start),
            end_time: Some(end),
            ..self
        })
    }

    /// Checks the invariants that a deserialized record may violate.
    ///
    /// # Errors
    ///
    /// Same conditions as [`QuizResult::from_persisted`].
    pub fn validate(&self) -> Result<(), ResultError> {
        let sum = self.counts().sum();
        if sum != u64::from(self.total) {
            return Err(ResultError::CountMismatch {
                total: self.total,
                sum,
            });
        }
        check_range(self.start_time, self.end_time)
    }

    #[must_use]
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn unanswered(&self) -> u32 {
        self.unanswered
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn counts(&self) -> ScoreCounts {
        ScoreCounts {
            correct: self.correct,
            incorrect: self.incorrect,
            unanswered: self.unanswered,
        }
    }

    #[must_use]
    pub fn duration_stats(&self) -> DurationStats {
        self.duration_stats
    }

    /// Share of correct answers, in percent. `None` for an empty quiz.
    #[must_use]
    pub fn score_percent(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(f64::from(self.correct) * 100.0 / f64::from(self.total))
    }

    /// Wall-clock length of the session when both ends are known.
    #[must_use]
    pub fn elapsed_ms(&self) -> Option<i64> {
        Some((self.end_time? - self.start_time?).num_milliseconds())
    }
}

fn check_range(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), ResultError> {
    match (start, end) {
        (Some(s), Some(e)) if e < s => Err(ResultError::InvalidTimeRange),
        _ => Ok(()),
    }
}
