//! Shared test support: in-memory collaborators standing in for the auth
//! service, the chat participant table, and the message store, plus hub
//! driving helpers.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use social_gateway::domain::{AuthVerifier, ChatDirectory, Message, MessageStore, MessageType};
use social_gateway::gateway::{ClientCommand, GatewayHub, ServerEvent};
use social_gateway::shared::GatewayError;

pub struct StaticAuth {
    tokens: HashMap<String, i64>,
}

#[async_trait]
impl AuthVerifier for StaticAuth {
    async fn verify(&self, credential: &str) -> Result<i64, GatewayError> {
        self.tokens
            .get(credential)
            .copied()
            .ok_or_else(|| GatewayError::Auth("unknown token".into()))
    }
}

pub struct AllowList {
    participants: HashSet<(i64, i64)>,
}

#[async_trait]
impl ChatDirectory for AllowList {
    async fn is_participant(&self, user_id: i64, room_id: i64) -> Result<bool, GatewayError> {
        Ok(self.participants.contains(&(user_id, room_id)))
    }
}

pub struct MemoryStore {
    next_id: AtomicI64,
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create(
        &self,
        room_id: i64,
        sender_id: i64,
        content: &str,
        message_type: MessageType,
    ) -> Result<Message, GatewayError> {
        Ok(Message {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            room_id,
            sender_id,
            sender_name: format!("user-{}", sender_id),
            sender_avatar: None,
            content: content.to_string(),
            message_type,
            created_at: Utc::now(),
        })
    }
}

/// Build a hub where tokens "alice"/"bob"/"carol" map to users 1/2/3, and
/// the given (user, room) pairs are authorized participants.
pub fn build_hub(participants: &[(i64, i64)]) -> Arc<GatewayHub> {
    let tokens = HashMap::from([
        ("alice".to_string(), 1),
        ("bob".to_string(), 2),
        ("carol".to_string(), 3),
    ]);
    Arc::new(GatewayHub::new(
        Arc::new(StaticAuth { tokens }),
        Arc::new(AllowList {
            participants: participants.iter().copied().collect(),
        }),
        Arc::new(MemoryStore {
            next_id: AtomicI64::new(1),
        }),
    ))
}

pub struct TestConnection {
    pub id: String,
    pub rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestConnection {
    /// All events delivered so far.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

pub async fn connect(hub: &GatewayHub, token: &str) -> TestConnection {
    let (tx, rx) = mpsc::unbounded_channel();
    let (id, _user) = hub.connect(token, tx).await.expect("handshake refused");
    TestConnection { id, rx }
}

pub async fn join(hub: &GatewayHub, conn: &TestConnection, room_id: i64) {
    hub.handle_command(&conn.id, ClientCommand::JoinRoom { room_id })
        .await;
}

pub async fn send(hub: &GatewayHub, conn: &TestConnection, room_id: i64, content: &str) {
    hub.handle_command(
        &conn.id,
        ClientCommand::SendMessage {
            room_id,
            content: content.to_string(),
            message_type: "text".to_string(),
        },
    )
    .await;
}
