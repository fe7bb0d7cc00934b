//! WebSocket transport for coaching sessions.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;

use crate::app::AppContext;
use crate::session::{MessageOutcome, Session};

pub async fn ws_upgrade(State(ctx): State<Arc<AppContext>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, ctx))
}

/// Drive one session over a socket until the peer goes away.
///
/// Transient read errors do not kill the session: the loop logs, waits
/// briefly to bound the error rate, and keeps reading. A close frame or
/// stream end does end it.
async fn run_session(mut socket: WebSocket, ctx: Arc<AppContext>) {
    let mut session = Session::new(ctx.clone());
    session.activate();
    tracing::info!("coaching session established");

    loop {
        let frame = match socket.recv().await {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => {
                tracing::warn!("transient socket read error: {}", err);
                tokio::time::sleep(ctx.session.read_retry_delay).await;
                continue;
            }
            None => break,
        };

        let text = match frame {
            Message::Text(text) => text.to_string(),
            Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    tracing::warn!("dropping non-UTF-8 binary frame");
                    continue;
                }
            },
            Message::Close(_) => {
                tracing::info!("client closed the session");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        // A fresh consultation is pushed back to the client; every other
        // outcome is one-way.
        if let MessageOutcome::Consulted(feedback) = session.on_message(&text).await {
            match serde_json::to_string(&feedback) {
                Ok(json) => {
                    if socket.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(err) => tracing::warn!("could not encode feedback reply: {}", err),
            }
        }
    }

    session.close();
    tracing::info!("coaching session closed");
}
