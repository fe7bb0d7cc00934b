//! HTTP surface: router assembly and server lifecycle.

mod api;
mod ws;

use std::future::Future;
use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app::AppContext;
use crate::config::ServerConfig;
use crate::error::ServerError;

/// Build the application router.
pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/statements", get(api::list_statements))
        .route("/summary/{problem_id}", get(api::get_summary))
        .route("/ws", get(ws::ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Bind the listener and serve until `shutdown` resolves.
pub async fn serve(
    config: &ServerConfig,
    ctx: Arc<AppContext>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| ServerError::Bind {
            addr: format!("{}:{}", config.host, config.port),
            source: e,
        })?;

    tracing::info!("coach listening on {}:{}", config.host, config.port);

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("server shutting down");
        })
        .await?;
    Ok(())
}
