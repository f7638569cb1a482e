use async_trait::async_trait;
use quiz_core::model::{QuizId, QuizResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::blob::BlobResultHistory;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key-value contract of the host application's persistent store.
///
/// Values are opaque blobs; the store knows nothing about their format.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the blob cannot be written.
    async fn save_blob(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// Load the blob stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn load_blob(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Remove the blob under `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn delete_blob(&self, key: &str) -> Result<(), StorageError>;
}

/// Repository contract for finished quiz results, grouped per quiz.
#[async_trait]
pub trait ResultHistoryRepository: Send + Sync {
    /// Append a result to the quiz's history.
    ///
    /// Returns the position of the new entry in the (possibly trimmed) history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the history cannot be read or written.
    async fn append_result(&self, quiz_id: &QuizId, result: &QuizResult)
    -> Result<usize, StorageError>;

    /// All results for a quiz, oldest first. Unknown quizzes yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored history is corrupt.
    async fn list_results(&self, quiz_id: &QuizId) -> Result<Vec<QuizResult>, StorageError>;

    /// Drop the whole history of a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    async fn clear_results(&self, quiz_id: &QuizId) -> Result<(), StorageError>;
}

/// Simple in-memory blob store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryBlobStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn save_blob(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let mut guard = self
            .blobs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), bytes);
        Ok(())
    }

    async fn load_blob(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let guard = self
            .blobs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn delete_blob(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .blobs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Aggregates the blob store and the repositories built on it for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub blobs: Arc<dyn BlobStore>,
    pub results: Arc<dyn ResultHistoryRepository>,
}

impl Storage {
    /// Repositories over the given blob store, keeping at most `history_limit`
    /// results per quiz.
    #[must_use]
    pub fn over(blobs: Arc<dyn BlobStore>, history_limit: usize) -> Self {
        let results: Arc<dyn ResultHistoryRepository> =
            Arc::new(BlobResultHistory::new(blobs.clone()).with_limit(history_limit));
        Self { blobs, results }
    }

    #[must_use]
    pub fn in_memory(history_limit: usize) -> Self {
        Self::over(Arc::new(InMemoryBlobStore::new()), history_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blob_round_trip_and_delete() {
        let store = InMemoryBlobStore::new();
        assert_eq!(store.load_blob("k").await.unwrap(), None);

        store.save_blob("k", b"one".to_vec()).await.unwrap();
        store.save_blob("k", b"two".to_vec()).await.unwrap();
        assert_eq!(store.load_blob("k").await.unwrap(), Some(b"two".to_vec()));

        store.delete_blob("k").await.unwrap();
        store.delete_blob("k").await.unwrap();
        assert_eq!(store.load_blob("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clones_share_the_same_map() {
        let store = InMemoryBlobStore::new();
        let other = store.clone();
        store.save_blob("shared", vec![1, 2, 3]).await.unwrap();
        assert_eq!(other.load_blob("shared").await.unwrap(), Some(vec![1, 2, 3]));
    }
}
