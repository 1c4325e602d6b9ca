//! Gateway Hub
//!
//! Ties the session registry, presence tracker, room membership, and typing
//! state together behind one command-dispatch surface. Each connection's
//! task calls into the hub sequentially, preserving per-connection command
//! order; the hub itself holds no lock across a collaborator await, so a
//! suspended authorization or persistence call never blocks other
//! connections.

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::presence::PresenceTracker;
use super::protocol::{ClientCommand, ServerEvent};
use super::registry::SessionRegistry;
use super::rooms::RoomRegistry;
use super::typing::TypingState;
use crate::domain::{AuthVerifier, ChatDirectory, Message, MessageStore, MessageType};
use crate::shared::GatewayError;

/// Central coordinator for all live connections.
pub struct GatewayHub {
    registry: SessionRegistry,
    presence: PresenceTracker,
    rooms: RoomRegistry,
    typing: TypingState,
    auth: Arc<dyn AuthVerifier>,
    directory: Arc<dyn ChatDirectory>,
    messages: Arc<dyn MessageStore>,
}

impl GatewayHub {
    pub fn new(
        auth: Arc<dyn AuthVerifier>,
        directory: Arc<dyn ChatDirectory>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            presence: PresenceTracker::new(),
            rooms: RoomRegistry::new(),
            typing: TypingState::new(),
            auth,
            directory,
            messages,
        }
    }

    /// Authenticate and register a new connection.
    ///
    /// On success the connection receives `Ready`, and a `UserOnline` edge
    /// is broadcast if this is the user's first live connection. On failure
    /// nothing is registered and no peer observes the refused connection.
    pub async fn connect(
        &self,
        credential: &str,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<(String, i64), GatewayError> {
        let user_id = self.auth.verify(credential).await?;
        let connection_id = Uuid::new_v4().to_string();

        self.registry
            .register(connection_id.clone(), user_id, sender);
        self.registry.send_to(
            &connection_id,
            ServerEvent::Ready {
                user_id,
                connection_id: connection_id.clone(),
            },
        );

        if self.presence.on_connect(user_id) {
            self.registry.broadcast(ServerEvent::UserOnline { user_id });
        }

        Ok((connection_id, user_id))
    }

    /// Tear down a connection: unregister, vacate joined rooms, reset typing
    /// state for rooms left empty, and broadcast the offline edge if this
    /// was the user's last connection.
    ///
    /// Idempotent; duplicate disconnect notifications are absorbed. Cleanup
    /// completes before this returns, so a fresh handshake can never inherit
    /// stale membership.
    pub fn disconnect(&self, connection_id: &str) {
        let Some(user_id) = self.registry.unregister(connection_id) else {
            return;
        };

        for room_id in self.rooms.purge_connection(connection_id) {
            self.typing.clear_room(room_id);
        }

        if self.presence.on_disconnect(user_id) {
            self.registry
                .broadcast(ServerEvent::UserOffline { user_id });
        }
    }

    /// Dispatch a single client command.
    ///
    /// All failures are reported as an `Error` event to the originating
    /// connection only.
    pub async fn handle_command(&self, connection_id: &str, command: ClientCommand) {
        let result = match command {
            ClientCommand::Identify { .. } => {
                Err(GatewayError::Internal("Already identified".into()))
            }
            ClientCommand::JoinRoom { room_id } => self.join_room(connection_id, room_id).await,
            ClientCommand::LeaveRoom { room_id } => self.leave_room(connection_id, room_id),
            ClientCommand::SendMessage {
                room_id,
                content,
                message_type,
            } => {
                self.send_message(
                    connection_id,
                    room_id,
                    &content,
                    MessageType::from_str(&message_type),
                )
                .await
            }
            ClientCommand::TypingStart { room_id } => {
                self.typing_signal(connection_id, room_id, true)
            }
            ClientCommand::TypingStop { room_id } => {
                self.typing_signal(connection_id, room_id, false)
            }
        };

        if let Err(e) = result {
            tracing::debug!(connection_id, error = %e, "Command failed");
            self.registry.send_to(
                connection_id,
                ServerEvent::Error {
                    message: e.to_string(),
                },
            );
        }
    }

    async fn join_room(&self, connection_id: &str, room_id: i64) -> Result<(), GatewayError> {
        let user_id = self.resolve(connection_id)?;

        // The participant check suspends only this connection's processing;
        // no registry lock is held across it.
        if !self.directory.is_participant(user_id, room_id).await? {
            return Err(GatewayError::Denied);
        }

        self.rooms.join(connection_id, room_id);
        self.registry
            .send_to(connection_id, ServerEvent::JoinedRoom { room_id });
        tracing::info!(user_id, room_id, "User joined room");
        Ok(())
    }

    fn leave_room(&self, connection_id: &str, room_id: i64) -> Result<(), GatewayError> {
        if self.rooms.leave(connection_id, room_id) {
            self.typing.clear_room(room_id);
        }
        self.registry
            .send_to(connection_id, ServerEvent::LeftRoom { room_id });
        Ok(())
    }

    async fn send_message(
        &self,
        connection_id: &str,
        room_id: i64,
        content: &str,
        message_type: MessageType,
    ) -> Result<(), GatewayError> {
        let user_id = self.resolve(connection_id)?;

        // Persist first; dispatch is a side effect of a durable write, never
        // a substitute for one.
        let message = self
            .messages
            .create(room_id, user_id, content, message_type)
            .await?;

        self.dispatch(message);
        Ok(())
    }

    /// Fan an already-persisted message out to every current member of its
    /// room. Connections that dropped mid-loop are skipped; the message
    /// remains retrievable by a later page fetch.
    pub fn dispatch(&self, message: Message) {
        let room_id = message.room_id;
        let members = self.rooms.members(room_id);
        let delivered = members
            .iter()
            .filter(|member| {
                self.registry.send_to(
                    member,
                    ServerEvent::ReceiveMessage {
                        message: message.clone(),
                    },
                )
            })
            .count();

        tracing::debug!(
            room_id,
            message_id = message.id,
            delivered,
            members = members.len(),
            "Message dispatched"
        );
    }

    fn typing_signal(
        &self,
        connection_id: &str,
        room_id: i64,
        is_typing: bool,
    ) -> Result<(), GatewayError> {
        let user_id = self.resolve(connection_id)?;
        self.typing.set(room_id, user_id, is_typing);

        // Everyone in the room except the originating connection. A signal
        // missed by a briefly-disconnected peer is not retried.
        for member in self.rooms.members(room_id) {
            if member != connection_id {
                self.registry.send_to(
                    &member,
                    ServerEvent::UserTyping {
                        room_id,
                        user_id,
                        is_typing,
                    },
                );
            }
        }
        Ok(())
    }

    fn resolve(&self, connection_id: &str) -> Result<i64, GatewayError> {
        self.registry
            .resolve_user(connection_id)
            .ok_or_else(|| GatewayError::NotFound("unknown connection".into()))
    }

    /// Whether a user has at least one live connection.
    pub fn is_online(&self, user_id: i64) -> bool {
        self.presence.is_online(user_id)
    }

    /// Number of live connections across all users.
    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    /// Users currently marked as typing in a room.
    pub fn typing_users(&self, room_id: i64) -> Vec<i64> {
        self.typing.typing_users(room_id)
    }

    /// Member connections of a room.
    pub fn room_members(&self, room_id: i64) -> Vec<String> {
        self.rooms.members(room_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::collaborators::{MockAuthVerifier, MockChatDirectory, MockMessageStore};

    fn hub_with(
        auth: MockAuthVerifier,
        directory: MockChatDirectory,
        messages: MockMessageStore,
    ) -> GatewayHub {
        GatewayHub::new(Arc::new(auth), Arc::new(directory), Arc::new(messages))
    }

    #[tokio::test]
    async fn refused_credential_registers_nothing() {
        let mut auth = MockAuthVerifier::new();
        auth.expect_verify()
            .returning(|_| Err(GatewayError::Auth("bad token".into())));
        let hub = hub_with(auth, MockChatDirectory::new(), MockMessageStore::new());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = hub.connect("nope", tx).await;

        assert!(matches!(result, Err(GatewayError::Auth(_))));
        assert_eq!(hub.connection_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn denied_join_mutates_nothing_and_errors_caller_only() {
        let mut auth = MockAuthVerifier::new();
        auth.expect_verify().returning(|_| Ok(1));
        let mut directory = MockChatDirectory::new();
        directory
            .expect_is_participant()
            .returning(|_, _| Ok(false));
        let hub = hub_with(auth, directory, MockMessageStore::new());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (conn, _) = hub.connect("token", tx).await.unwrap();
        assert!(matches!(
            rx.try_recv().unwrap(),
            ServerEvent::Ready { .. }
        ));
        // Online edge for the first connection.
        assert!(matches!(
            rx.try_recv().unwrap(),
            ServerEvent::UserOnline { user_id: 1 }
        ));

        hub.handle_command(&conn, ClientCommand::JoinRoom { room_id: 5 })
            .await;

        assert!(hub.room_members(5).is_empty());
        assert!(matches!(rx.try_recv().unwrap(), ServerEvent::Error { .. }));
    }

    #[tokio::test]
    async fn persistence_failure_suppresses_dispatch() {
        let mut auth = MockAuthVerifier::new();
        auth.expect_verify().returning(|_| Ok(1));
        let mut directory = MockChatDirectory::new();
        directory.expect_is_participant().returning(|_, _| Ok(true));
        let mut messages = MockMessageStore::new();
        messages
            .expect_create()
            .returning(|_, _, _, _| Err(GatewayError::Persistence("insert failed".into())));
        let hub = hub_with(auth, directory, messages);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (conn, _) = hub.connect("token", tx).await.unwrap();
        hub.handle_command(&conn, ClientCommand::JoinRoom { room_id: 5 })
            .await;
        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(event, ServerEvent::Error { .. }));
        }

        hub.handle_command(
            &conn,
            ClientCommand::SendMessage {
                room_id: 5,
                content: "hi".into(),
                message_type: "text".into(),
            },
        )
        .await;

        // The caller gets exactly the error, never a ReceiveMessage.
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, ServerEvent::Error { .. }));
        assert!(rx.try_recv().is_err());
    }
}
