mod result_history_repo;

use std::sync::Arc;

use quiz_core::model::QuizId;

use crate::repository::BlobStore;

/// Result history kept as one JSON blob per quiz.
///
/// Appends are read-modify-write on the blob, so appends for the same quiz are
/// expected to be serialized by the caller (one active session per quiz).
#[derive(Clone)]
pub struct BlobResultHistory {
    store: Arc<dyn BlobStore>,
    limit: usize,
}

impl BlobResultHistory {
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            limit: usize::MAX,
        }
    }

    /// Keep at most `limit` results per quiz, dropping the oldest first.
    /// A zero limit is treated as one.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub(crate) fn key(quiz_id: &QuizId) -> String {
        format!("results/{quiz_id}")
    }
}
