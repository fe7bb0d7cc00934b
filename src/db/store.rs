//! PostgreSQL store.

use std::ops::DerefMut;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::NoTls;

use crate::config::DatabaseConfig;
use crate::db::{Database, FeedbackPayload, FeedbackSnapshot, StatementRecord, SummaryRecord};
use crate::error::DatabaseError;

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// Postgres-backed `Database` implementation.
pub struct Store {
    pool: Pool,
}

impl Store {
    /// Create the connection pool and verify the database is reachable.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let mut cfg = Config::new();
        cfg.url = Some(config.url.clone());
        cfg.pool = Some(deadpool_postgres::PoolConfig {
            max_size: config.pool_size,
            ..Default::default()
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::Pool(e.to_string()))?;

        // Fail fast if the database is unreachable.
        let _ = pool.get().await?;

        Ok(Self { pool })
    }

    /// Apply embedded schema migrations.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let mut conn = self.pool.get().await?;
        let report = embedded::migrations::runner()
            .run_async(conn.deref_mut().deref_mut())
            .await?;
        for migration in report.applied_migrations() {
            tracing::info!("applied migration {}", migration);
        }
        Ok(())
    }

    async fn conn(&self) -> Result<deadpool_postgres::Object, DatabaseError> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl Database for Store {
    async fn upsert_statement(&self, record: &StatementRecord) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO statements (problem_id, statement, fetched_at) \
             VALUES ($1, $2, $3) ON CONFLICT (problem_id) DO NOTHING",
            &[&record.problem_id, &record.statement, &record.fetched_at],
        )
        .await?;
        Ok(())
    }

    async fn get_statement(&self, problem_id: &str) -> Result<Option<String>, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT statement FROM statements WHERE problem_id = $1",
                &[&problem_id],
            )
            .await?;
        Ok(row.map(|r| r.get(0)))
    }

    async fn list_statements(&self) -> Result<Vec<StatementRecord>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT problem_id, statement, fetched_at FROM statements ORDER BY fetched_at DESC",
                &[],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| StatementRecord {
                problem_id: r.get(0),
                statement: r.get(1),
                fetched_at: r.get(2),
            })
            .collect())
    }

    async fn append_snapshot(&self, snapshot: &FeedbackSnapshot) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        let payload = snapshot.feedback.as_ref();
        let feedback = payload.map(|p| p.feedback.as_str());
        let suggestions = payload.map(|p| &p.suggestions);
        let proofs = payload.map(|p| &p.proofs);
        let meta_cognition = payload.map(|p| &p.meta_cognition);

        conn.execute(
            "INSERT INTO feedback_snapshots \
             (id, problem_id, created_at, code, thoughts, feedback, suggestions, proofs, meta_cognition) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            &[
                &snapshot.id,
                &snapshot.problem_id,
                &snapshot.created_at,
                &snapshot.code,
                &snapshot.thoughts,
                &feedback,
                &suggestions,
                &proofs,
                &meta_cognition,
            ],
        )
        .await?;
        Ok(())
    }

    async fn latest_feedback_at(
        &self,
        problem_id: &str,
    ) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT created_at FROM feedback_snapshots \
                 WHERE problem_id = $1 AND feedback IS NOT NULL \
                 ORDER BY created_at DESC LIMIT 1",
                &[&problem_id],
            )
            .await?;
        Ok(row.map(|r| r.get(0)))
    }

    async fn snapshots_for_problem(
        &self,
        problem_id: &str,
    ) -> Result<Vec<FeedbackSnapshot>, DatabaseError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT id, problem_id, created_at, code, thoughts, \
                        feedback, suggestions, proofs, meta_cognition \
                 FROM feedback_snapshots WHERE problem_id = $1 ORDER BY created_at ASC",
                &[&problem_id],
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let feedback: Option<String> = r.get(5);
                let payload = feedback.map(|feedback| FeedbackPayload {
                    feedback,
                    suggestions: r.get::<_, Option<Vec<String>>>(6).unwrap_or_default(),
                    proofs: r.get::<_, Option<Vec<String>>>(7).unwrap_or_default(),
                    meta_cognition: r.get::<_, Option<Vec<String>>>(8).unwrap_or_default(),
                });
                FeedbackSnapshot {
                    id: r.get(0),
                    problem_id: r.get(1),
                    created_at: r.get(2),
                    code: r.get(3),
                    thoughts: r.get(4),
                    feedback: payload,
                }
            })
            .collect())
    }

    async fn upsert_summary(&self, record: &SummaryRecord) -> Result<(), DatabaseError> {
        let conn = self.conn().await?;
        conn.execute(
            "INSERT INTO summaries (problem_id, feedback, proof, meta_cognition, created_at) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (problem_id) DO NOTHING",
            &[
                &record.problem_id,
                &record.feedback,
                &record.proof,
                &record.meta_cognition,
                &record.created_at,
            ],
        )
        .await?;
        Ok(())
    }

    async fn get_summary(&self, problem_id: &str) -> Result<Option<SummaryRecord>, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT problem_id, feedback, proof, meta_cognition, created_at \
                 FROM summaries WHERE problem_id = $1",
                &[&problem_id],
            )
            .await?;
        Ok(row.map(|r| SummaryRecord {
            problem_id: r.get(0),
            feedback: r.get(1),
            proof: r.get(2),
            meta_cognition: r.get(3),
            created_at: r.get(4),
        }))
    }
}
