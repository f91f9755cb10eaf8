//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::error::ServerError;

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
///
/// The session is registered only once the upgrade has completed, so a
/// failed handshake never leaves an emitter behind.
///
/// # Errors
///
/// Returns [`ServerError::ShuttingDown`] (503) once shutdown has begun.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServerError> {
    state.broadcaster.ensure_accepting()?;
    let broadcaster = Arc::clone(&state.broadcaster);

    Ok(ws
        .on_failed_upgrade(|e| tracing::warn!(error = %e, "ws upgrade failed"))
        .on_upgrade(move |mut socket| async move {
            match broadcaster.connect() {
                Ok(session) => run_connection(socket, session, broadcaster).await,
                Err(e) => {
                    tracing::debug!(error = %e, "refusing ws session");
                    let _ = socket.send(Message::Close(None)).await;
                }
            }
        }))
}
