//! Reconnecting gateway client.
//!
//! Keeps the illusion of a continuously live connection across transient
//! network loss: on an unexpected drop the controller re-dials with
//! exponential backoff, re-identifies, and re-issues `JoinRoom` for every
//! room the caller had open. The server holds no memory of the old
//! connection's memberships, so this re-subscription is the reconciliation
//! mechanism; missed presence and typing transitions are not replayed.

use std::collections::HashSet;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::state::{ConnectionState, ReconnectConfig};
use crate::gateway::{ClientCommand, ServerEvent};

/// How long to wait for the server's `Ready` after sending `Identify`.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Client-side command errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The connection is down or still being re-established. Retryable:
    /// nothing is queued, so the caller decides when to try again.
    #[error("Not connected")]
    NotConnected,

    /// The controller has shut down.
    #[error("Connection closed")]
    Closed,
}

enum Request {
    Command(ClientCommand),
    Shutdown,
}

/// Handle to a managed gateway connection.
///
/// Commands issued while not `Connected` fail fast with
/// [`ClientError::NotConnected`]; this policy is applied consistently to
/// every command, and nothing is queued across an outage.
pub struct GatewayClient {
    request_tx: mpsc::UnboundedSender<Request>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl GatewayClient {
    /// Start the connection controller.
    ///
    /// Returns the handle and the stream of server events. Events arrive in
    /// the order the server sent them on the current connection.
    pub fn connect(
        url: String,
        token: String,
        config: ReconnectConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        tokio::spawn(run_loop(url, token, config, state_tx, request_rx, event_tx));

        (
            Self {
                request_tx,
                state_rx,
            },
            event_rx,
        )
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    /// Watch channel for state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn join_room(&self, room_id: i64) -> Result<(), ClientError> {
        self.command(ClientCommand::JoinRoom { room_id })
    }

    pub fn leave_room(&self, room_id: i64) -> Result<(), ClientError> {
        self.command(ClientCommand::LeaveRoom { room_id })
    }

    pub fn send_message(&self, room_id: i64, content: &str) -> Result<(), ClientError> {
        self.command(ClientCommand::SendMessage {
            room_id,
            content: content.to_string(),
            message_type: "text".to_string(),
        })
    }

    pub fn typing_start(&self, room_id: i64) -> Result<(), ClientError> {
        self.command(ClientCommand::TypingStart { room_id })
    }

    pub fn typing_stop(&self, room_id: i64) -> Result<(), ClientError> {
        self.command(ClientCommand::TypingStop { room_id })
    }

    /// Close the connection and stop reconnecting.
    pub fn close(&self) {
        let _ = self.request_tx.send(Request::Shutdown);
    }

    fn command(&self, command: ClientCommand) -> Result<(), ClientError> {
        if !self.state_rx.borrow().is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.request_tx
            .send(Request::Command(command))
            .map_err(|_| ClientError::Closed)
    }
}

/// Connection management loop. Owns the joined-room set used for
/// re-subscription after a reconnect; the set is updated from the server's
/// `JoinedRoom`/`LeftRoom` acknowledgements.
async fn run_loop(
    url: String,
    token: String,
    config: ReconnectConfig,
    state_tx: watch::Sender<ConnectionState>,
    mut request_rx: mpsc::UnboundedReceiver<Request>,
    event_tx: mpsc::UnboundedSender<ServerEvent>,
) {
    let mut joined_rooms: HashSet<i64> = HashSet::new();
    let mut attempt = 0u32;
    let mut ever_connected = false;

    loop {
        let _ = state_tx.send(if ever_connected || attempt > 0 {
            ConnectionState::Reconnecting { attempt }
        } else {
            ConnectionState::Connecting
        });

        let stream = match connect_async(url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                tracing::debug!(error = %e, "Dial failed");
                if !config.should_retry(attempt) {
                    let _ = state_tx.send(ConnectionState::Failed {
                        reason: format!("Max reconnect attempts ({}) exceeded", config.max_attempts),
                    });
                    return;
                }
                tokio::time::sleep(config.delay_for_attempt(attempt)).await;
                attempt += 1;
                continue;
            }
        };

        let (mut write, mut read) = stream.split();

        // Identify, then wait for Ready. An explicit refusal is terminal:
        // retrying with the same credential cannot succeed.
        let identify = ClientCommand::Identify {
            token: token.clone(),
        };
        let handshake_ok = send_command(&mut write, &identify).await
            && match timeout(HANDSHAKE_TIMEOUT, await_ready(&mut read)).await {
                Ok(Handshake::Ready) => true,
                Ok(Handshake::Refused(reason)) => {
                    let _ = state_tx.send(ConnectionState::Failed { reason });
                    return;
                }
                Ok(Handshake::Dropped) | Err(_) => false,
            };

        if !handshake_ok {
            if !config.should_retry(attempt) {
                let _ = state_tx.send(ConnectionState::Failed {
                    reason: format!("Max reconnect attempts ({}) exceeded", config.max_attempts),
                });
                return;
            }
            tokio::time::sleep(config.delay_for_attempt(attempt)).await;
            attempt += 1;
            continue;
        }

        let _ = state_tx.send(ConnectionState::Connected);
        attempt = 0;
        ever_connected = true;
        tracing::info!("Gateway connected");

        // State reconciliation: re-subscribe every previously joined room.
        for room_id in &joined_rooms {
            let rejoin = ClientCommand::JoinRoom { room_id: *room_id };
            if !send_command(&mut write, &rejoin).await {
                break;
            }
        }

        // Live loop: forward caller commands out, server events in.
        let mut connection_lost = false;
        loop {
            tokio::select! {
                request = request_rx.recv() => match request {
                    Some(Request::Command(command)) => {
                        if !send_command(&mut write, &command).await {
                            connection_lost = true;
                            break;
                        }
                    }
                    Some(Request::Shutdown) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        let _ = state_tx.send(ConnectionState::Disconnected);
                        return;
                    }
                },
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerEvent>(&text) {
                            Ok(event) => {
                                match &event {
                                    ServerEvent::JoinedRoom { room_id } => {
                                        joined_rooms.insert(*room_id);
                                    }
                                    ServerEvent::LeftRoom { room_id } => {
                                        joined_rooms.remove(room_id);
                                    }
                                    _ => {}
                                }
                                if event_tx.send(event).is_err() {
                                    // Consumer gone; stop reconnecting.
                                    let _ = state_tx.send(ConnectionState::Disconnected);
                                    return;
                                }
                            }
                            Err(e) => tracing::warn!(error = %e, "Unparseable event"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        connection_lost = true;
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "WebSocket read error");
                        connection_lost = true;
                        break;
                    }
                },
            }
        }

        if connection_lost {
            tracing::info!("Gateway connection lost, reconnecting");
            // Fail-fast policy: anything that raced into the channel during
            // the drop is discarded, not replayed after reconnect.
            loop {
                match request_rx.try_recv() {
                    Ok(Request::Command(_)) => continue,
                    Ok(Request::Shutdown) => {
                        let _ = state_tx.send(ConnectionState::Disconnected);
                        return;
                    }
                    Err(_) => break,
                }
            }
        }
    }
}

enum Handshake {
    Ready,
    Refused(String),
    Dropped,
}

/// Consume frames until the handshake resolves one way or the other.
async fn await_ready<S>(read: &mut S) -> Handshake
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                Ok(ServerEvent::Ready { .. }) => return Handshake::Ready,
                Ok(ServerEvent::Error { message }) => return Handshake::Refused(message),
                Ok(_) | Err(_) => continue,
            },
            Ok(Message::Close(_)) | Err(_) => return Handshake::Dropped,
            Ok(_) => continue,
        }
    }
    Handshake::Dropped
}

async fn send_command<S>(write: &mut S, command: &ClientCommand) -> bool
where
    S: SinkExt<Message> + Unpin,
{
    let text = match serde_json::to_string(command) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize command");
            return false;
        }
    };
    write.send(Message::Text(text.into())).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commands_fail_fast_when_disconnected() {
        // Dial target that will never answer; the client stays in a
        // connecting state and must refuse commands immediately.
        let (client, _events) = GatewayClient::connect(
            "ws://127.0.0.1:9".to_string(),
            "token".to_string(),
            ReconnectConfig {
                max_attempts: 1,
                initial_delay_ms: 10,
                ..Default::default()
            },
        );

        let result = client.join_room(1);
        assert!(matches!(result, Err(ClientError::NotConnected)));
        let result = client.send_message(1, "hello");
        assert!(matches!(result, Err(ClientError::NotConnected)));
    }
}
