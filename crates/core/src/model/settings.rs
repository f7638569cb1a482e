use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("max total questions must be > 0")]
    InvalidMaxTotal,

    #[error("history limit must be > 0")]
    InvalidHistoryLimit,
}

/// Configuration for building and recording custom quizzes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSettings", rename_all = "camelCase")]
pub struct QuizSettings {
    max_total: u32,
    shuffle: bool,
    history_limit: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawSettings {
    max_total: u32,
    shuffle: bool,
    history_limit: u32,
}

impl Default for RawSettings {
    fn default() -> Self {
        let d = QuizSettings::default();
        Self {
            max_total: d.max_total,
            shuffle: d.shuffle,
            history_limit: d.history_limit,
        }
    }
}

impl TryFrom<RawSettings> for QuizSettings {
    type Error = SettingsError;

    fn try_from(raw: RawSettings) -> Result<Self, Self::Error> {
        Self::new(raw.max_total, raw.shuffle, raw.history_limit)
    }
}

impl QuizSettings {
    pub const DEFAULT_MAX_TOTAL: u32 = 100;
    pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

    /// # Errors
    ///
    /// Returns `SettingsError` if `max_total` or `history_limit` is zero.
    pub fn new(max_total: u32, shuffle: bool, history_limit: u32) -> Result<Self, SettingsError> {
        if max_total == 0 {
            return Err(SettingsError::InvalidMaxTotal);
        }
        if history_limit == 0 {
            return Err(SettingsError::InvalidHistoryLimit);
        }
        Ok(Self {
            max_total,
            shuffle,
            history_limit,
        })
    }

    /// Same settings with a different quiz size.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidMaxTotal` for zero.
    pub fn with_max_total(self, max_total: u32) -> Result<Self, SettingsError> {
        Self::new(max_total, self.shuffle, self.history_limit)
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Upper bound on the number of questions in a composed quiz.
    #[must_use]
    pub fn max_total(&self) -> u32 {
        self.max_total
    }

    /// Whether subject pools are shuffled before sampling.
    #[must_use]
    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    /// Number of results kept per quiz; older ones are dropped first.
    #[must_use]
    pub fn history_limit(&self) -> u32 {
        self.history_limit
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            max_total: Self::DEFAULT_MAX_TOTAL,
            shuffle: true,
            history_limit: Self::DEFAULT_HISTORY_LIMIT,
        }
    }
}
