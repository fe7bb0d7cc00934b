//! HTTP request handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::app::AppContext;
use crate::error::SummarizeError;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy" })
}

/// Serve the consolidated summary for a problem's feedback history.
pub async fn get_summary(
    State(ctx): State<Arc<AppContext>>,
    Path(problem_id): Path<String>,
) -> Response {
    if problem_id.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "missing problem id").into_response();
    }

    match ctx.summarizer.summarize(&problem_id).await {
        Ok(record) => Json(record).into_response(),
        Err(err @ (SummarizeError::NoStatement { .. } | SummarizeError::NoHistory { .. })) => {
            (StatusCode::NOT_FOUND, err.to_string()).into_response()
        }
        Err(err) => {
            tracing::error!(problem = %problem_id, "summarization failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error during summarization",
            )
                .into_response()
        }
    }
}

/// List every stored problem statement.
pub async fn list_statements(State(ctx): State<Arc<AppContext>>) -> Response {
    match ctx.db.list_statements().await {
        Ok(records) => Json(records).into_response(),
        Err(err) => {
            tracing::error!("failed to list statements: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error fetching statements",
            )
                .into_response()
        }
    }
}
