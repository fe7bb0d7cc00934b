//! Per-connection session handling.
//!
//! Each WebSocket connection gets one `Session`, a small state machine the
//! transport driver feeds frame-by-frame:
//!
//! - `Open`: created, upgrade not yet acknowledged
//! - `Active`: reading and processing snapshots
//! - `Closed`: loop exited, connection released
//!
//! Processing is strictly sequential per session: the driver does not read
//! the next frame until the current one is fully handled, which is the
//! system's only backpressure. Sessions hold no cross-connection state —
//! the consultation throttle reads the shared database.

mod throttle;

pub use throttle::FeedbackThrottle;

use std::sync::Arc;

use serde::Deserialize;

use crate::app::AppContext;
use crate::db::{FeedbackPayload, FeedbackSnapshot};
use crate::llm::Feedback;

/// Lifecycle of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Active,
    Closed,
}

/// An editor snapshot streamed by the client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorMessage {
    pub problem_id: String,
    pub code: String,
    pub thoughts: String,
}

/// What happened to one inbound frame.
#[derive(Debug)]
pub enum MessageOutcome {
    /// Frame was not a valid editor snapshot; dropped.
    Dropped,
    /// Statement could not be resolved; nothing persisted this round.
    StatementUnavailable,
    /// The model consultation failed; nothing persisted this round.
    ConsultationFailed,
    /// Snapshot persisted as a history point, throttle was closed.
    Recorded,
    /// Snapshot persisted together with fresh feedback.
    Consulted(Feedback),
    /// The session is not `Active`.
    NotActive,
}

/// One connection's coaching session.
pub struct Session {
    ctx: Arc<AppContext>,
    state: SessionState,
}

impl Session {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self {
            ctx,
            state: SessionState::Open,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Mark the upgrade as complete; the session starts accepting frames.
    pub fn activate(&mut self) {
        if self.state == SessionState::Open {
            self.state = SessionState::Active;
        }
    }

    /// The connection is gone; no further frames will be processed.
    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Handle one inbound frame.
    ///
    /// Failures are contained to the current frame: malformed payloads and
    /// collaborator errors are logged and the session stays `Active`.
    pub async fn on_message(&mut self, raw: &str) -> MessageOutcome {
        if self.state != SessionState::Active {
            return MessageOutcome::NotActive;
        }

        let msg: EditorMessage = match serde_json::from_str(raw) {
            Ok(msg) => msg,
            Err(err) => {
                tracing::warn!("could not parse incoming snapshot: {}", err);
                return MessageOutcome::Dropped;
            }
        };

        self.process(msg).await
    }

    async fn process(&self, msg: EditorMessage) -> MessageOutcome {
        let statement = match self.ctx.resolver.resolve(&msg.problem_id).await {
            Ok(statement) => statement,
            Err(err) => {
                tracing::warn!(problem = %msg.problem_id, "statement resolution failed: {}", err);
                return MessageOutcome::StatementUnavailable;
            }
        };

        let consult = match self.ctx.throttle.should_consult(&msg.problem_id).await {
            Ok(consult) => consult,
            Err(err) => {
                tracing::warn!(problem = %msg.problem_id, "throttle lookup failed: {}", err);
                false
            }
        };

        if !consult {
            // Throttle closed: keep a code-only history point.
            let snapshot = FeedbackSnapshot::new(&msg.problem_id, &msg.code, &msg.thoughts);
            if let Err(err) = self.ctx.db.append_snapshot(&snapshot).await {
                tracing::warn!(problem = %msg.problem_id, "saving snapshot failed: {}", err);
            }
            return MessageOutcome::Recorded;
        }

        tracing::info!(problem = %msg.problem_id, "asking the model for fresh feedback");
        let feedback = match self
            .ctx
            .model
            .feedback(&msg.code, &msg.thoughts, &statement)
            .await
        {
            Ok(feedback) => feedback,
            Err(err) => {
                tracing::warn!(problem = %msg.problem_id, "model feedback failed: {}", err);
                return MessageOutcome::ConsultationFailed;
            }
        };

        let snapshot = FeedbackSnapshot::new(&msg.problem_id, &msg.code, &msg.thoughts)
            .with_feedback(FeedbackPayload {
                feedback: feedback.feedback.clone(),
                suggestions: feedback.suggestions.clone(),
                proofs: feedback.proofs.clone(),
                meta_cognition: feedback.meta_cognition.clone(),
            });
        if let Err(err) = self.ctx.db.append_snapshot(&snapshot).await {
            tracing::warn!(problem = %msg.problem_id, "saving feedback snapshot failed: {}", err);
        }

        MessageOutcome::Consulted(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use crate::config::SessionConfig;
    use crate::db::{Database, MemoryStore, StatementRecord};
    use crate::error::{FetchError, LlmError};
    use crate::llm::{CoachModel, FeedbackSummary};
    use crate::problem::ProblemId;
    use crate::statement::StatementFetcher;

    struct FixedFetcher {
        fail: bool,
    }

    #[async_trait]
    impl StatementFetcher for FixedFetcher {
        async fn fetch(&self, _problem: &ProblemId) -> Result<String, FetchError> {
            if self.fail {
                Err(FetchError::Empty)
            } else {
                Ok("<div>statement</div>".to_string())
            }
        }
    }

    struct CountingCoach {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingCoach {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CoachModel for CountingCoach {
        async fn feedback(
            &self,
            _code: &str,
            _thoughts: &str,
            _statement: &str,
        ) -> Result<Feedback, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(LlmError::RequestFailed {
                    provider: "stub".to_string(),
                    reason: "boom".to_string(),
                })
            } else {
                Ok(Feedback {
                    feedback: "looks right".to_string(),
                    ..Feedback::default()
                })
            }
        }

        async fn summarize(
            &self,
            _statement: &str,
            _feedbacks: &[String],
            _proofs: &[String],
            _meta_cognition: &[String],
        ) -> Result<FeedbackSummary, LlmError> {
            Ok(FeedbackSummary::default())
        }
    }

    fn context(
        db: Arc<MemoryStore>,
        model: Arc<CountingCoach>,
        fetcher: FixedFetcher,
    ) -> Arc<AppContext> {
        Arc::new(AppContext::new(
            db,
            model,
            Arc::new(fetcher),
            SessionConfig::default(),
        ))
    }

    const VALID: &str = r#"{"problemId":"1873G2","code":"int main(){}","thoughts":"greedy?"}"#;

    #[tokio::test]
    async fn test_upgrade_activates_and_close_ends() {
        let ctx = context(
            Arc::new(MemoryStore::new()),
            Arc::new(CountingCoach::new()),
            FixedFetcher { fail: false },
        );
        let mut session = Session::new(ctx);
        assert_eq!(session.state(), SessionState::Open);
        session.activate();
        assert_eq!(session.state(), SessionState::Active);
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_frames_ignored_unless_active() {
        let ctx = context(
            Arc::new(MemoryStore::new()),
            Arc::new(CountingCoach::new()),
            FixedFetcher { fail: false },
        );
        let mut session = Session::new(ctx);
        assert!(matches!(
            session.on_message(VALID).await,
            MessageOutcome::NotActive
        ));
    }

    #[tokio::test]
    async fn test_malformed_frame_dropped_session_stays_active() {
        let db = Arc::new(MemoryStore::new());
        let model = Arc::new(CountingCoach::new());
        let ctx = context(db.clone(), model.clone(), FixedFetcher { fail: false });
        let mut session = Session::new(ctx);
        session.activate();

        assert!(matches!(
            session.on_message("not json at all").await,
            MessageOutcome::Dropped
        ));
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(model.calls(), 0);

        // The next well-formed frame processes normally.
        assert!(matches!(
            session.on_message(VALID).await,
            MessageOutcome::Consulted(_)
        ));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_consultation_persists_full_snapshot() {
        let db = Arc::new(MemoryStore::new());
        let model = Arc::new(CountingCoach::new());
        let ctx = context(db.clone(), model, FixedFetcher { fail: false });
        let mut session = Session::new(ctx);
        session.activate();

        let outcome = session.on_message(VALID).await;
        let MessageOutcome::Consulted(feedback) = outcome else {
            panic!("expected consultation, got {:?}", outcome);
        };
        assert_eq!(feedback.feedback, "looks right");

        let history = db.snapshots_for_problem("1873G2").await.unwrap();
        assert_eq!(history.len(), 1);
        let payload = history[0].feedback.as_ref().unwrap();
        assert_eq!(payload.feedback, "looks right");
        assert_eq!(history[0].code, "int main(){}");
    }

    #[tokio::test]
    async fn test_throttled_round_records_history_point() {
        let db = Arc::new(MemoryStore::new());
        let model = Arc::new(CountingCoach::new());
        let ctx = context(db.clone(), model.clone(), FixedFetcher { fail: false });
        let mut session = Session::new(ctx);
        session.activate();

        assert!(matches!(
            session.on_message(VALID).await,
            MessageOutcome::Consulted(_)
        ));
        // Second snapshot lands inside the window: recorded, not consulted.
        assert!(matches!(
            session.on_message(VALID).await,
            MessageOutcome::Recorded
        ));
        assert_eq!(model.calls(), 1);

        let history = db.snapshots_for_problem("1873G2").await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].feedback.is_some());
        assert!(history[1].feedback.is_none());
    }

    #[tokio::test]
    async fn test_consults_again_once_window_elapses() {
        let db = Arc::new(MemoryStore::new());
        // Seed feedback old enough to reopen the window.
        let mut old =
            FeedbackSnapshot::new("1873G2", "old", "old").with_feedback(FeedbackPayload::default());
        old.created_at = Utc::now() - Duration::seconds(90);
        db.append_snapshot(&old).await.unwrap();

        let model = Arc::new(CountingCoach::new());
        let ctx = context(db, model.clone(), FixedFetcher { fail: false });
        let mut session = Session::new(ctx);
        session.activate();

        assert!(matches!(
            session.on_message(VALID).await,
            MessageOutcome::Consulted(_)
        ));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_resolution_failure_skips_the_round() {
        let db = Arc::new(MemoryStore::new());
        let model = Arc::new(CountingCoach::new());
        let ctx = context(db.clone(), model.clone(), FixedFetcher { fail: true });
        let mut session = Session::new(ctx);
        session.activate();

        assert!(matches!(
            session.on_message(VALID).await,
            MessageOutcome::StatementUnavailable
        ));
        assert_eq!(model.calls(), 0);
        assert!(db.snapshots_for_problem("1873G2").await.unwrap().is_empty());
        assert_eq!(session.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn test_model_failure_persists_nothing() {
        let db = Arc::new(MemoryStore::new());
        db.upsert_statement(&StatementRecord::new("1873G2", "text"))
            .await
            .unwrap();
        let model = Arc::new(CountingCoach::failing());
        let ctx = context(db.clone(), model, FixedFetcher { fail: false });
        let mut session = Session::new(ctx);
        session.activate();

        assert!(matches!(
            session.on_message(VALID).await,
            MessageOutcome::ConsultationFailed
        ));
        assert!(db.snapshots_for_problem("1873G2").await.unwrap().is_empty());
        assert_eq!(session.state(), SessionState::Active);
    }
}
