//! External collaborator traits.
//!
//! The gateway is a pure consumer of three services owned elsewhere in the
//! application: credential verification, the persisted chat-participant
//! lookup, and the message store. Each is modeled as an object-safe trait so
//! the real-time core can be exercised against in-memory implementations.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::message::{Message, MessageType};
use crate::shared::GatewayError;

/// Validates the bearer credential presented at handshake time.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    /// Returns the authenticated user ID, or an `Auth` error for a bad or
    /// missing credential.
    async fn verify(&self, credential: &str) -> Result<i64, GatewayError>;
}

/// Read-only query over the persisted chat membership.
///
/// The gateway owns no transactional boundary here; the query is idempotent
/// and carries its own error surface (timeout, not-found).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    /// Whether `user_id` is an active participant of `room_id`.
    async fn is_participant(&self, user_id: i64, room_id: i64) -> Result<bool, GatewayError>;
}

/// Durable message persistence.
///
/// Broadcast is a side effect of persistence, never a substitute for it: the
/// pipeline only dispatches messages this store has already created.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message and return it with sender display fields
    /// resolved.
    async fn create(
        &self,
        room_id: i64,
        sender_id: i64,
        content: &str,
        message_type: MessageType,
    ) -> Result<Message, GatewayError>;
}
