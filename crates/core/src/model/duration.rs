use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ids::QuestionId;

/// Time spent on the question that was active before a navigation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationSample {
    #[serde(rename = "questionID")]
    pub question_id: QuestionId,
    pub index: usize,
    /// When the navigation that closed this interval happened.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub duration_ms: i64,
}

/// Per-question rollup of every sample attributed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationInfo {
    pub total_ms: i64,
    pub view_count: u32,
}

impl DurationInfo {
    pub fn add(&mut self, duration_ms: i64) {
        self.total_ms = self.total_ms.saturating_add(duration_ms);
        self.view_count = self.view_count.saturating_add(1);
    }
}

/// Min/max/avg/sum over a session's duration samples.
///
/// `Unavailable` is the sentinel for a session without samples. It is not a
/// zero duration and renders as `N/A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DurationStats {
    #[default]
    Unavailable,
    #[serde(rename_all = "camelCase")]
    Measured {
        min_ms: i64,
        max_ms: i64,
        avg_ms: i64,
        sum_ms: i64,
    },
}

impl DurationStats {
    /// Computes the statistics over raw sample durations.
    ///
    /// The average uses integer division so recomputation is bit-for-bit stable.
    #[must_use]
    pub fn from_durations(durations: impl IntoIterator<Item = i64>) -> Self {
        let mut count = 0_i64;
        let mut min = i64::MAX;
        let mut max = i64::MIN;
        let mut sum = 0_i64;
        for d in durations {
            count += 1;
            min = min.min(d);
            max = max.max(d);
            sum = sum.saturating_add(d);
        }
        if count == 0 {
            return Self::Unavailable;
        }
        Self::Measured {
            min_ms: min,
            max_ms: max,
            avg_ms: sum / count,
            sum_ms: sum,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Measured { .. })
    }

    #[must_use]
    pub fn min_ms(&self) -> Option<i64> {
        match self {
            Self::Measured { min_ms, .. } => Some(*min_ms),
            Self::Unavailable => None,
        }
    }

    #[must_use]
    pub fn max_ms(&self) -> Option<i64> {
        match self {
            Self::Measured { max_ms, .. } => Some(*max_ms),
            Self::Unavailable => None,
        }
    }

    #[must_use]
    pub fn avg_ms(&self) -> Option<i64> {
        match self {
            Self::Measured { avg_ms, .. } => Some(*avg_ms),
            Self::Unavailable => None,
        }
    }

    #[must_use]
    pub fn sum_ms(&self) -> Option<i64> {
        match self {
            Self::Measured { sum_ms, .. } => Some(*sum_ms),
            Self::Unavailable => None,
        }
    }
}

/// Renders a millisecond value as `m:ss`, or `N/A` when absent.
#[must_use]
pub fn format_duration(ms: Option<i64>) -> String {
    match ms {
        Some(ms) => {
            let secs = ms.max(0) / 1000;
            format!("{}:{:02}", secs / 60, secs % 60)
        }
        None => "N/A".to_owned(),
    }
}

impl fmt::Display for DurationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => f.write_str("N/A"),
            Self::Measured { .. } => write!(
                f,
                "min {} / max {} / avg {} / total {}",
                format_duration(self.min_ms()),
                format_duration(self.max_ms()),
                format_duration(self.avg_ms()),
                format_duration(self.sum_ms()),
            ),
        }
    }
}
