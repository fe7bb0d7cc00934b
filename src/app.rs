//! Shared collaborators for sessions and HTTP handlers.

use std::sync::Arc;

use crate::config::SessionConfig;
use crate::db::Database;
use crate::llm::CoachModel;
use crate::session::FeedbackThrottle;
use crate::statement::{StatementFetcher, StatementResolver};
use crate::summary::Summarizer;

/// Everything a session or handler needs, wired once at startup and shared
/// behind an `Arc`. Collaborators are capability traits so tests inject
/// in-memory doubles.
pub struct AppContext {
    pub db: Arc<dyn Database>,
    pub model: Arc<dyn CoachModel>,
    pub resolver: StatementResolver,
    pub throttle: FeedbackThrottle,
    pub summarizer: Summarizer,
    pub session: SessionConfig,
}

impl AppContext {
    pub fn new(
        db: Arc<dyn Database>,
        model: Arc<dyn CoachModel>,
        fetcher: Arc<dyn StatementFetcher>,
        session: SessionConfig,
    ) -> Self {
        Self {
            resolver: StatementResolver::new(db.clone(), fetcher),
            throttle: FeedbackThrottle::new(db.clone(), session.feedback_window),
            summarizer: Summarizer::new(db.clone(), model.clone()),
            db,
            model,
            session,
        }
    }
}
