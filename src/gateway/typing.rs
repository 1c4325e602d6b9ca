//! Typing Indicator State
//!
//! In-memory `room -> typing users` sets, never persisted. A room's set is
//! reset when its last connection disconnects. There is no expiry timer: a
//! lost stop signal leaves a stale indicator until the next signal, which is
//! an accepted limitation of the protocol.

use dashmap::DashMap;
use std::collections::HashSet;

#[derive(Default)]
pub struct TypingState {
    typing: DashMap<i64, HashSet<i64>>,
}

impl TypingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a typing-state change for a user in a room.
    pub fn set(&self, room_id: i64, user_id: i64, is_typing: bool) {
        if is_typing {
            self.typing.entry(room_id).or_default().insert(user_id);
        } else {
            if let Some(mut users) = self.typing.get_mut(&room_id) {
                users.remove(&user_id);
            }
            self.typing.remove_if(&room_id, |_, users| users.is_empty());
        }
    }

    /// Users currently marked as typing in a room.
    pub fn typing_users(&self, room_id: i64) -> Vec<i64> {
        self.typing
            .get(&room_id)
            .map(|u| u.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Reset a room's typing set, used when its last connection goes away.
    pub fn clear_room(&self, room_id: i64) {
        self.typing.remove(&room_id);
    }
}
