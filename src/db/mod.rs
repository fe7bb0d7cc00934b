//! Persistence layer.
//!
//! Storage is a capability: the `Database` trait covers the operations the
//! session loop and the summarizer need, with a Postgres implementation for
//! production and an in-memory one for tests and local development. All
//! cross-connection state — in particular the consultation throttle's clock
//! — lives behind this trait.

mod memory;
mod store;

pub use memory::MemoryStore;
pub use store::Store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DatabaseError;

/// A stored problem statement.
///
/// Write-once: the first writer wins and duplicate inserts are ignored, so
/// two sessions racing to resolve the same problem cannot lose data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementRecord {
    pub problem_id: String,
    pub statement: String,
    pub fetched_at: DateTime<Utc>,
}

impl StatementRecord {
    pub fn new(problem_id: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            problem_id: problem_id.into(),
            statement: statement.into(),
            fetched_at: Utc::now(),
        }
    }
}

/// Model output attached to a snapshot after a consultation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackPayload {
    pub feedback: String,
    pub suggestions: Vec<String>,
    pub proofs: Vec<String>,
    pub meta_cognition: Vec<String>,
}

/// One timestamped capture of a user's code and reasoning.
///
/// `feedback` is `None` for pure history points recorded while the
/// consultation throttle was closed. The history is append-only, ordered
/// by `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSnapshot {
    pub id: Uuid,
    pub problem_id: String,
    pub created_at: DateTime<Utc>,
    pub code: String,
    pub thoughts: String,
    pub feedback: Option<FeedbackPayload>,
}

impl FeedbackSnapshot {
    pub fn new(
        problem_id: impl Into<String>,
        code: impl Into<String>,
        thoughts: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            problem_id: problem_id.into(),
            created_at: Utc::now(),
            code: code.into(),
            thoughts: thoughts.into(),
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, payload: FeedbackPayload) -> Self {
        self.feedback = Some(payload);
        self
    }
}

/// Consolidated feedback over a problem's whole history. At most one per
/// problem; the upsert is idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub problem_id: String,
    pub feedback: String,
    pub proof: String,
    pub meta_cognition: String,
    pub created_at: DateTime<Utc>,
}

/// Database abstraction layer.
#[async_trait]
pub trait Database: Send + Sync {
    /// Persist a statement unless one already exists for the problem.
    /// A duplicate insert is success, not an error.
    async fn upsert_statement(&self, record: &StatementRecord) -> Result<(), DatabaseError>;

    async fn get_statement(&self, problem_id: &str) -> Result<Option<String>, DatabaseError>;

    async fn list_statements(&self) -> Result<Vec<StatementRecord>, DatabaseError>;

    /// Append one snapshot to the problem's history.
    async fn append_snapshot(&self, snapshot: &FeedbackSnapshot) -> Result<(), DatabaseError>;

    /// Timestamp of the latest snapshot that carries a feedback payload.
    /// Payload-less history points do not count.
    async fn latest_feedback_at(
        &self,
        problem_id: &str,
    ) -> Result<Option<DateTime<Utc>>, DatabaseError>;

    /// Full history for a problem, oldest first.
    async fn snapshots_for_problem(
        &self,
        problem_id: &str,
    ) -> Result<Vec<FeedbackSnapshot>, DatabaseError>;

    /// Persist a summary unless one already exists for the problem.
    async fn upsert_summary(&self, record: &SummaryRecord) -> Result<(), DatabaseError>;

    async fn get_summary(&self, problem_id: &str) -> Result<Option<SummaryRecord>, DatabaseError>;
}
