use quiz_core::model::{QuizId, QuizResult};

use super::BlobResultHistory;
use crate::repository::{ResultHistoryRepository, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn decode(bytes: &[u8]) -> Result<Vec<QuizResult>, StorageError> {
    let results: Vec<QuizResult> = serde_json::from_slice(bytes).map_err(ser)?;
    for result in &results {
        result.validate().map_err(ser)?;
    }
    Ok(results)
}

impl BlobResultHistory {
    async fn load(&self, quiz_id: &QuizId) -> Result<Vec<QuizResult>, StorageError> {
        match self.store.load_blob(&Self::key(quiz_id)).await? {
            Some(bytes) => decode(&bytes),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl ResultHistoryRepository for BlobResultHistory {
    async fn append_result(
        &self,
        quiz_id: &QuizId,
        result: &QuizResult,
    ) -> Result<usize, StorageError> {
        let mut results = self.load(quiz_id).await?;
        results.push(result.clone());

        let overflow = results.len().saturating_sub(self.limit);
        if overflow > 0 {
            tracing::debug!(%quiz_id, dropped = overflow, "trimming result history");
            results.drain(..overflow);
        }

        let bytes = serde_json::to_vec(&results).map_err(ser)?;
        self.store.save_blob(&Self::key(quiz_id), bytes).await?;
        Ok(results.len() - 1)
    }

    async fn list_results(&self, quiz_id: &QuizId) -> Result<Vec<QuizResult>, StorageError> {
        self.load(quiz_id).await
    }

    async fn clear_results(&self, quiz_id: &QuizId) -> Result<(), StorageError> {
        self.store.delete_blob(&Self::key(quiz_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{BlobStore, InMemoryBlobStore};
    use quiz_core::model::{DurationStats, ScoreCounts};
    use std::sync::Arc;

    fn result(correct: u32) -> QuizResult {
        QuizResult::new(
            ScoreCounts {
                correct,
                incorrect: 1,
                unanswered: 0,
            },
            DurationStats::Unavailable,
            None,
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn stored_under_quiz_scoped_key() {
        let store = Arc::new(InMemoryBlobStore::new());
        let repo = BlobResultHistory::new(store.clone());
        let quiz = QuizId::new("anatomy").unwrap();

        repo.append_result(&quiz, &result(1)).await.unwrap();
        assert!(store.load_blob("results/anatomy").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupt_blob_is_a_serialization_error() {
        let store = Arc::new(InMemoryBlobStore::new());
        store
            .save_blob("results/broken", b"{not json".to_vec())
            .await
            .unwrap();
        let repo = BlobResultHistory::new(store);
        let err = repo
            .list_results(&QuizId::new("broken").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn inconsistent_counts_are_rejected_on_load() {
        let store = Arc::new(InMemoryBlobStore::new());
        let raw = br#"[{"correct":1,"incorrect":0,"unanswered":0,"total":3,"durationStats":{"status":"unavailable"}}]"#;
        store.save_blob("results/bad", raw.to_vec()).await.unwrap();
        let repo = BlobResultHistory::new(store);
        let err = repo
            .list_results(&QuizId::new("bad").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn overflowing_counts_are_rejected_on_load() {
        let store = Arc::new(InMemoryBlobStore::new());
        let raw = br#"[{"correct":4294967295,"incorrect":1,"unanswered":0,"total":0,"durationStats":{"status":"unavailable"}}]"#;
        store.save_blob("results/huge", raw.to_vec()).await.unwrap();
        let repo = BlobResultHistory::new(store);
        let err = repo
            .list_results(&QuizId::new("huge").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn limit_drops_oldest() {
        let repo = BlobResultHistory::new(Arc::new(InMemoryBlobStore::new())).with_limit(2);
        let quiz = QuizId::new("q").unwrap();
        for correct in 1..=3 {
            repo.append_result(&quiz, &result(correct)).await.unwrap();
        }
        let kept: Vec<u32> = repo
            .list_results(&quiz)
            .await
            .unwrap()
            .iter()
            .map(QuizResult::correct)
            .collect();
        assert_eq!(kept, vec![2, 3]);
    }
}
