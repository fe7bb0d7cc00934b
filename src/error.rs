//! Error types, one enum per concern.

use thiserror::Error;

use crate::problem::ParseProblemIdError;

/// Errors assembling configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {name}")]
    MissingVar { name: &'static str },

    #[error("invalid value for {name}: {reason}")]
    InvalidVar { name: &'static str, reason: String },
}

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("connection pool error: {0}")]
    Pool(String),

    #[error(transparent)]
    Checkout(#[from] deadpool_postgres::PoolError),

    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Migration(#[from] refinery::Error),
}

/// Errors fetching a statement from the rendering sidecar.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    InvalidId(#[from] ParseProblemIdError),

    #[error("renderer request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("renderer returned {status}: {body}")]
    Renderer {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("renderer returned an empty statement")]
    Empty,

    #[error("statement fetch cancelled before completion")]
    Cancelled,
}

/// Errors from the model capability.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("authentication with {provider} failed")]
    AuthFailed { provider: String },

    #[error("{provider} rate limited the request")]
    RateLimited { provider: String },

    #[error("request to {provider} failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Errors resolving a problem statement (cache lookup or fetch).
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Errors building a feedback-history summary.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("no statement on file for {problem_id}")]
    NoStatement { problem_id: String },

    #[error("no feedback history for {problem_id}")]
    NoHistory { problem_id: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Errors from the HTTP server lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Serve(#[from] std::io::Error),
}
