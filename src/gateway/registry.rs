//! Session Registry
//!
//! The authoritative connection -> user mapping, established only after the
//! handshake credential has been verified. Every other component attributes
//! actions to a user through [`SessionRegistry::resolve_user`] rather than
//! trusting client-supplied identity.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::protocol::ServerEvent;

/// A registered connection and its outbound event channel.
pub struct RegisteredConnection {
    pub user_id: i64,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

/// Connection registry keyed by connection ID.
#[derive(Default)]
pub struct SessionRegistry {
    connections: DashMap<String, Arc<RegisteredConnection>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an authenticated connection.
    ///
    /// The caller must have validated the credential already; refused
    /// connections never reach this point.
    pub fn register(
        &self,
        connection_id: String,
        user_id: i64,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) {
        let connection = Arc::new(RegisteredConnection { user_id, sender });
        self.connections.insert(connection_id.clone(), connection);

        tracing::info!(user_id, connection_id = %connection_id, "Connection registered");
    }

    /// Remove a connection. Idempotent: unregistering an unknown ID is a
    /// no-op, which absorbs duplicate disconnect notifications.
    ///
    /// Returns the user the connection belonged to so the caller can drive
    /// presence and membership cleanup.
    pub fn unregister(&self, connection_id: &str) -> Option<i64> {
        let (_, connection) = self.connections.remove(connection_id)?;
        tracing::info!(
            user_id = connection.user_id,
            connection_id = %connection_id,
            "Connection unregistered"
        );
        Some(connection.user_id)
    }

    /// Resolve the authenticated user behind a connection.
    pub fn resolve_user(&self, connection_id: &str) -> Option<i64> {
        self.connections.get(connection_id).map(|c| c.user_id)
    }

    /// Send an event to a single connection.
    ///
    /// Returns false if the connection is gone or its channel is closed;
    /// callers treat that as a skip, not an error.
    pub fn send_to(&self, connection_id: &str, event: ServerEvent) -> bool {
        match self.connections.get(connection_id) {
            Some(connection) => connection.sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Broadcast an event to every registered connection.
    pub fn broadcast(&self, event: ServerEvent) {
        for entry in self.connections.iter() {
            let _ = entry.sender.send(event.clone());
        }
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
