//! Consultation throttling.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::db::Database;
use crate::error::DatabaseError;

/// Decides whether enough time has passed since the last stored feedback
/// to justify a new model consultation for a problem.
///
/// The decision is computed from persisted state, so concurrent sessions
/// on one problem share a single window. The check and the later snapshot
/// write are not atomic; two sessions can both pass inside one window and
/// produce a duplicate consultation, which is accepted.
pub struct FeedbackThrottle {
    db: Arc<dyn Database>,
    window: Duration,
}

impl FeedbackThrottle {
    pub fn new(db: Arc<dyn Database>, window: std::time::Duration) -> Self {
        Self {
            db,
            window: Duration::from_std(window).unwrap_or_else(|_| Duration::seconds(60)),
        }
    }

    /// True when no feedback exists yet for the problem, or the latest
    /// feedback is older than the window.
    pub async fn should_consult(&self, problem_id: &str) -> Result<bool, DatabaseError> {
        match self.db.latest_feedback_at(problem_id).await? {
            None => Ok(true),
            Some(at) => Ok(Utc::now() - at > self.window),
        }
    }
}
