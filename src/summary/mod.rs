//! Feedback history aggregation.

use std::sync::Arc;

use chrono::Utc;

use crate::db::{Database, SummaryRecord};
use crate::error::SummarizeError;
use crate::llm::CoachModel;

/// Builds one consolidated summary from a problem's feedback history.
///
/// Summaries are cache-first: once computed and persisted, later requests
/// return the stored record without consulting the model again.
pub struct Summarizer {
    db: Arc<dyn Database>,
    model: Arc<dyn CoachModel>,
}

impl Summarizer {
    pub fn new(db: Arc<dyn Database>, model: Arc<dyn CoachModel>) -> Self {
        Self { db, model }
    }

    /// Summarize the feedback history for a problem.
    ///
    /// Fails with not-found when no statement is on file or no snapshots
    /// exist; in the latter case the model is never invoked.
    pub async fn summarize(&self, problem_id: &str) -> Result<SummaryRecord, SummarizeError> {
        if let Some(existing) = self.db.get_summary(problem_id).await? {
            return Ok(existing);
        }

        let statement = self.db.get_statement(problem_id).await?.ok_or_else(|| {
            SummarizeError::NoStatement {
                problem_id: problem_id.to_string(),
            }
        })?;

        let snapshots = self.db.snapshots_for_problem(problem_id).await?;
        if snapshots.is_empty() {
            return Err(SummarizeError::NoHistory {
                problem_id: problem_id.to_string(),
            });
        }

        // Partition the history into parallel collections, keeping snapshot
        // order and skipping empty fields.
        let mut feedbacks = Vec::new();
        let mut proofs = Vec::new();
        let mut meta_cognition = Vec::new();
        for snapshot in &snapshots {
            let Some(payload) = &snapshot.feedback else {
                continue;
            };
            if !payload.feedback.is_empty() {
                feedbacks.push(payload.feedback.clone());
            }
            proofs.extend(payload.proofs.iter().filter(|p| !p.is_empty()).cloned());
            meta_cognition.extend(
                payload
                    .meta_cognition
                    .iter()
                    .filter(|m| !m.is_empty())
                    .cloned(),
            );
        }

        let summary = self
            .model
            .summarize(&statement, &feedbacks, &proofs, &meta_cognition)
            .await?;

        let record = SummaryRecord {
            problem_id: problem_id.to_string(),
            feedback: summary.feedback,
            proof: summary.proof,
            meta_cognition: summary.meta_cognition,
            created_at: Utc::now(),
        };
        // Concurrent summarizations may race here; the first write wins and
        // "already summarized" is not an error.
        self.db.upsert_summary(&record).await?;
        Ok(record)
    }
}
