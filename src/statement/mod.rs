//! Problem statement resolution.
//!
//! Cache-first: a statement is rendered by the sidecar at most once per
//! problem and persisted write-once; later sessions hit the database.

mod browserless;
mod fetcher;

pub use browserless::BrowserlessFetcher;
pub use fetcher::{RetryPolicy, StatementFetcher};

use std::sync::Arc;

use crate::db::{Database, StatementRecord};
use crate::error::{FetchError, ResolveError};
use crate::problem::ProblemId;

/// Cache-or-fetch lookup of problem statements.
pub struct StatementResolver {
    db: Arc<dyn Database>,
    fetcher: Arc<dyn StatementFetcher>,
}

impl StatementResolver {
    pub fn new(db: Arc<dyn Database>, fetcher: Arc<dyn StatementFetcher>) -> Self {
        Self { db, fetcher }
    }

    /// Return the statement for `problem_id`, fetching and persisting it on
    /// first use.
    ///
    /// A fetch failure propagates and nothing partial is persisted; an
    /// empty render result counts as a failure. A concurrent insert of the
    /// same statement is not an error — the first writer wins.
    pub async fn resolve(&self, problem_id: &str) -> Result<String, ResolveError> {
        if let Some(statement) = self.db.get_statement(problem_id).await? {
            return Ok(statement);
        }

        let problem: ProblemId = problem_id.parse().map_err(FetchError::from)?;
        tracing::info!(problem = %problem, "statement missing, fetching from renderer");

        let statement = self.fetcher.fetch(&problem).await?;
        if statement.trim().is_empty() {
            return Err(ResolveError::Fetch(FetchError::Empty));
        }

        self.db
            .upsert_statement(&StatementRecord::new(problem_id, statement.clone()))
            .await?;
        Ok(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::db::MemoryStore;

    struct ScriptedFetcher {
        calls: AtomicUsize,
        body: String,
        fail: bool,
    }

    impl ScriptedFetcher {
        fn returning(body: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                body: body.to_string(),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                body: String::new(),
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatementFetcher for ScriptedFetcher {
        async fn fetch(&self, _problem: &ProblemId) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(FetchError::Renderer {
                    status: reqwest::StatusCode::BAD_GATEWAY,
                    body: "sidecar down".to_string(),
                })
            } else {
                Ok(self.body.clone())
            }
        }
    }

    #[tokio::test]
    async fn test_resolves_from_cache_without_fetching() {
        let db = Arc::new(MemoryStore::new());
        db.upsert_statement(&StatementRecord::new("1873G2", "cached text"))
            .await
            .unwrap();
        let fetcher = Arc::new(ScriptedFetcher::returning("fresh text"));
        let resolver = StatementResolver::new(db, fetcher.clone());

        let statement = resolver.resolve("1873G2").await.unwrap();
        assert_eq!(statement, "cached text");
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_fetches_once_then_serves_from_cache() {
        let db = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(ScriptedFetcher::returning("<div>statement</div>"));
        let resolver = StatementResolver::new(db, fetcher.clone());

        for _ in 0..3 {
            let statement = resolver.resolve("1873G2").await.unwrap();
            assert_eq!(statement, "<div>statement</div>");
        }
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_persists_nothing() {
        let db = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(ScriptedFetcher::failing());
        let resolver = StatementResolver::new(db.clone(), fetcher);

        let err = resolver.resolve("1873G2").await.unwrap_err();
        assert!(matches!(err, ResolveError::Fetch(_)));
        assert!(db.get_statement("1873G2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_render_result_is_an_error() {
        let db = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(ScriptedFetcher::returning("  \n"));
        let resolver = StatementResolver::new(db.clone(), fetcher);

        let err = resolver.resolve("1873G2").await.unwrap_err();
        assert!(matches!(err, ResolveError::Fetch(FetchError::Empty)));
        assert!(db.get_statement("1873G2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_id_fails_before_fetching() {
        let db = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(ScriptedFetcher::returning("text"));
        let resolver = StatementResolver::new(db, fetcher.clone());

        let err = resolver.resolve("G2").await.unwrap_err();
        assert!(matches!(err, ResolveError::Fetch(FetchError::InvalidId(_))));
        assert_eq!(fetcher.calls(), 0);
    }
}
