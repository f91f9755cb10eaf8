//! WebSocket session loop.
//!
//! Forwards the session's order updates to the client and watches the
//! socket for the client going away. Whatever ends the loop, the session
//! is handed back to the broadcaster on the way out.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};

use super::messages::WsMessage;
use crate::broadcast::{Session, SessionBroadcaster};
use crate::domain::{ConnectionId, OrderUpdate};

/// Why a session loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ended {
    /// The client closed the socket or it failed.
    ClientGone,
    /// The emitter was cancelled by server shutdown.
    ServerClosing,
}

/// Runs the read/write loop for a single WebSocket session.
///
/// - Forwards every update from the session's emitter as an
///   `order-update` frame.
/// - Ignores client data frames; a close frame or a socket error ends the
///   session.
/// - When the server shuts down, sends a close frame without forwarding
///   updates still queued for the session.
pub async fn run_connection(
    socket: WebSocket,
    mut session: Session,
    broadcaster: Arc<SessionBroadcaster>,
) {
    let id = session.id;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let ended = loop {
        tokio::select! {
            // Incoming frame from the client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break Ended::ClientGone,
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %id, error = %e, "ws read failed");
                        break Ended::ClientGone;
                    }
                    Some(Ok(Message::Text(text))) => {
                        tracing::trace!(connection_id = %id, len = text.as_str().len(), "ignoring client text frame");
                    }
                    Some(Ok(_)) => {}
                }
            }
            // Update from the session emitter; `None` once shut down
            update = session.next_update() => {
                let Some(update) = update else {
                    break Ended::ServerClosing;
                };
                if !forward(&mut ws_tx, &update, id).await {
                    break Ended::ClientGone;
                }
            }
        }
    };

    if ended == Ended::ServerClosing {
        let frame = CloseFrame {
            code: close_code::AWAY,
            reason: Utf8Bytes::from_static("server shutting down"),
        };
        let _ = ws_tx.send(Message::Close(Some(frame))).await;
    }

    // No-op when shutdown already cancelled this session's emitter.
    broadcaster.disconnect(id);
    tracing::debug!(connection_id = %id, ?ended, "ws connection closed");
}

/// Sends one update. Returns `false` if the socket is no longer writable.
///
/// A frame that fails to serialize is logged and skipped; it only affects
/// this connection.
async fn forward(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    update: &OrderUpdate,
    connection_id: ConnectionId,
) -> bool {
    let json = match WsMessage::order_update(update).and_then(|msg| msg.to_json()) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(%connection_id, error = %e, "failed to encode order update");
            return true;
        }
    };

    match ws_tx.send(Message::text(json)).await {
        Ok(()) => {
            tracing::trace!(%connection_id, order_id = update.order_id, "order update sent");
            true
        }
        Err(e) => {
            tracing::debug!(%connection_id, error = %e, "ws write failed");
            false
        }
    }
}
