//! Group Membership Manager
//!
//! Tracks which connections receive each room's events. Authorization is
//! checked by the hub before any mutation; a connection's presence in a
//! room's member set is authorization evidence, and the broadcast pipeline
//! trusts it without re-checking.

use dashmap::DashMap;
use std::collections::HashSet;

/// Two-sided membership index: room -> connections and connection -> rooms.
///
/// The reverse index lets disconnect cleanup vacate every joined room
/// without the caller enumerating them.
#[derive(Default)]
pub struct RoomRegistry {
    members: DashMap<i64, HashSet<String>>,
    joined: DashMap<String, HashSet<i64>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. The caller must have passed the
    /// participant authorization check already.
    pub fn join(&self, connection_id: &str, room_id: i64) {
        self.members
            .entry(room_id)
            .or_default()
            .insert(connection_id.to_string());
        self.joined
            .entry(connection_id.to_string())
            .or_default()
            .insert(room_id);

        tracing::debug!(connection_id, room_id, "Joined room");
    }

    /// Remove a connection from a room. Idempotent: leaving a room the
    /// connection is not in is a no-op.
    ///
    /// Returns true if the room's member set became empty.
    pub fn leave(&self, connection_id: &str, room_id: i64) -> bool {
        let mut now_empty = false;
        if let Some(mut members) = self.members.get_mut(&room_id) {
            members.remove(connection_id);
            now_empty = members.is_empty();
        }
        if now_empty {
            self.members.remove_if(&room_id, |_, members| members.is_empty());
        }
        if let Some(mut rooms) = self.joined.get_mut(connection_id) {
            rooms.remove(&room_id);
        }
        self.joined
            .remove_if(connection_id, |_, rooms| rooms.is_empty());
        now_empty
    }

    /// Remove a connection from every room it had joined.
    ///
    /// Returns the rooms whose member set became empty, so the caller can
    /// reset per-room ephemeral state (typing indicators).
    pub fn purge_connection(&self, connection_id: &str) -> Vec<i64> {
        let rooms = match self.joined.remove(connection_id) {
            Some((_, rooms)) => rooms,
            None => return Vec::new(),
        };

        let mut emptied = Vec::new();
        for room_id in rooms {
            let mut now_empty = false;
            if let Some(mut members) = self.members.get_mut(&room_id) {
                members.remove(connection_id);
                now_empty = members.is_empty();
            }
            if now_empty {
                self.members.remove_if(&room_id, |_, members| members.is_empty());
                emptied.push(room_id);
            }
        }

        tracing::debug!(connection_id, "Purged room subscriptions");
        emptied
    }

    /// Current member connections of a room.
    pub fn members(&self, room_id: i64) -> Vec<String> {
        self.members
            .get(&room_id)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether a connection is subscribed to a room.
    pub fn is_member(&self, connection_id: &str, room_id: i64) -> bool {
        self.members
            .get(&room_id)
            .map(|m| m.contains(connection_id))
            .unwrap_or(false)
    }

    /// Rooms a connection has joined.
    pub fn rooms_of(&self, connection_id: &str) -> Vec<i64> {
        self.joined
            .get(connection_id)
            .map(|r| r.iter().copied().collect())
            .unwrap_or_default()
    }
}
