//! WebSocket Connection Handler
//!
//! One persistent logical channel per client. The first frame must be an
//! `Identify` carrying the bearer credential; unauthenticated connections
//! are refused before any other component observes them.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::timeout;

use super::protocol::{ClientCommand, ServerEvent};
use crate::startup::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max_message_size = state.settings.websocket.max_message_size;
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection end to end.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    // Outbound events funnel through one channel so the hub can push to this
    // connection from any task.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize event");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    // Handshake: wait for Identify, bounded by the configured timeout.
    let identify_timeout = Duration::from_secs(state.settings.websocket.identify_timeout_secs);
    let credential = match timeout(identify_timeout, read_identify(&mut stream)).await {
        Ok(Some(token)) => token,
        Ok(None) => {
            tracing::debug!("Connection closed before Identify");
            return;
        }
        Err(_) => {
            tracing::debug!("Identify timeout");
            let _ = tx.send(ServerEvent::Error {
                message: "Identify timeout".into(),
            });
            return;
        }
    };

    let (connection_id, user_id) = match state.hub.connect(&credential, tx.clone()).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::debug!(error = %e, "Handshake refused");
            let _ = tx.send(ServerEvent::Error {
                message: e.to_string(),
            });
            return;
        }
    };

    tracing::info!(user_id, connection_id = %connection_id, "Client connected");

    // Per-connection command loop; commands are processed in the order
    // received.
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientCommand>(&text) {
                Ok(command) => state.hub.handle_command(&connection_id, command).await,
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "Bad frame");
                    let _ = tx.send(ServerEvent::Error {
                        message: format!("Invalid command: {}", e),
                    });
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Binary(_)) => {}
            Err(e) => {
                tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Cleanup must complete before the connection id could be reused by a
    // new handshake.
    state.hub.disconnect(&connection_id);
    drop(tx);
    let _ = writer.await;

    tracing::info!(user_id, connection_id = %connection_id, "Client disconnected");
}

/// Read frames until the Identify command arrives, returning its token.
/// Any other command before Identify is ignored; a closed stream yields None.
async fn read_identify(
    stream: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
) -> Option<String> {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if let Ok(ClientCommand::Identify { token }) = serde_json::from_str(&text) {
                    return Some(token);
                }
            }
            Ok(Message::Close(_)) | Err(_) => return None,
            _ => continue,
        }
    }
    None
}
