//! In-memory store for tests and local development.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::{Database, FeedbackSnapshot, StatementRecord, SummaryRecord};
use crate::error::DatabaseError;

/// A `Database` that lives entirely in process memory.
///
/// Mirrors the production store's semantics: write-once statements and
/// summaries, append-only snapshot history.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    statements: HashMap<String, StatementRecord>,
    snapshots: Vec<FeedbackSnapshot>,
    summaries: HashMap<String, SummaryRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Database for MemoryStore {
    async fn upsert_statement(&self, record: &StatementRecord) -> Result<(), DatabaseError> {
        let mut inner = self.write();
        inner
            .statements
            .entry(record.problem_id.clone())
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn get_statement(&self, problem_id: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self
            .read()
            .statements
            .get(problem_id)
            .map(|r| r.statement.clone()))
    }

    async fn list_statements(&self) -> Result<Vec<StatementRecord>, DatabaseError> {
        let mut records: Vec<_> = self.read().statements.values().cloned().collect();
        records.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at));
        Ok(records)
    }

    async fn append_snapshot(&self, snapshot: &FeedbackSnapshot) -> Result<(), DatabaseError> {
        self.write().snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn latest_feedback_at(
        &self,
        problem_id: &str,
    ) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        Ok(self
            .read()
            .snapshots
            .iter()
            .filter(|s| s.problem_id == problem_id && s.feedback.is_some())
            .map(|s| s.created_at)
            .max())
    }

    async fn snapshots_for_problem(
        &self,
        problem_id: &str,
    ) -> Result<Vec<FeedbackSnapshot>, DatabaseError> {
        let mut snapshots: Vec<_> = self
            .read()
            .snapshots
            .iter()
            .filter(|s| s.problem_id == problem_id)
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.created_at);
        Ok(snapshots)
    }

    async fn upsert_summary(&self, record: &SummaryRecord) -> Result<(), DatabaseError> {
        let mut inner = self.write();
        inner
            .summaries
            .entry(record.problem_id.clone())
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn get_summary(&self, problem_id: &str) -> Result<Option<SummaryRecord>, DatabaseError> {
        Ok(self.read().summaries.get(problem_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FeedbackPayload;
    use chrono::Duration;

    #[tokio::test]
    async fn test_statement_first_writer_wins() {
        let store = MemoryStore::new();
        store
            .upsert_statement(&StatementRecord::new("1873G2", "first"))
            .await
            .unwrap();
        store
            .upsert_statement(&StatementRecord::new("1873G2", "second"))
            .await
            .unwrap();

        let statement = store.get_statement("1873G2").await.unwrap();
        assert_eq!(statement.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_latest_feedback_ignores_history_points() {
        let store = MemoryStore::new();
        let old = Utc::now() - Duration::minutes(5);

        let mut with_payload = FeedbackSnapshot::new("2A", "code", "thoughts")
            .with_feedback(FeedbackPayload::default());
        with_payload.created_at = old;
        store.append_snapshot(&with_payload).await.unwrap();

        // A newer payload-less snapshot must not advance the clock.
        store
            .append_snapshot(&FeedbackSnapshot::new("2A", "code2", "thoughts2"))
            .await
            .unwrap();

        let at = store.latest_feedback_at("2A").await.unwrap();
        assert_eq!(at, Some(old));
    }

    #[tokio::test]
    async fn test_snapshots_ordered_oldest_first() {
        let store = MemoryStore::new();
        let mut a = FeedbackSnapshot::new("2A", "a", "");
        a.created_at = Utc::now() - Duration::minutes(2);
        let mut b = FeedbackSnapshot::new("2A", "b", "");
        b.created_at = Utc::now() - Duration::minutes(1);
        store.append_snapshot(&b).await.unwrap();
        store.append_snapshot(&a).await.unwrap();

        let history = store.snapshots_for_problem("2A").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].code, "a");
        assert_eq!(history[1].code, "b");
    }

    #[tokio::test]
    async fn test_summary_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let first = SummaryRecord {
            problem_id: "2A".to_string(),
            feedback: "first".to_string(),
            proof: String::new(),
            meta_cognition: String::new(),
            created_at: Utc::now(),
        };
        let second = SummaryRecord {
            feedback: "second".to_string(),
            ..first.clone()
        };
        store.upsert_summary(&first).await.unwrap();
        store.upsert_summary(&second).await.unwrap();

        let stored = store.get_summary("2A").await.unwrap().unwrap();
        assert_eq!(stored.feedback, "first");
    }
}
