//! Presence Tracker
//!
//! Derives per-user online/offline status from the number of that user's
//! live connections. Counting keeps multi-device sessions stable: a user
//! with two tabs does not flicker offline when one tab closes. Interested
//! parties are notified exactly on transition edges, not on every
//! connect/disconnect.

use dashmap::DashMap;

/// Per-user active connection counts.
#[derive(Default)]
pub struct PresenceTracker {
    counts: DashMap<i64, u32>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection for `user_id`.
    ///
    /// Returns true iff the count transitioned 0 -> 1, i.e. the caller
    /// should broadcast `UserOnline`.
    pub fn on_connect(&self, user_id: i64) -> bool {
        let mut entry = self.counts.entry(user_id).or_insert(0);
        *entry += 1;
        *entry == 1
    }

    /// Record a closed connection for `user_id`.
    ///
    /// Returns true iff the count transitioned 1 -> 0, i.e. the caller
    /// should broadcast `UserOffline`. A decrement below zero is a defect;
    /// it is logged and clamped, never allowed to go negative.
    pub fn on_disconnect(&self, user_id: i64) -> bool {
        let mut went_offline = false;
        let mut remove = false;
        if let Some(mut entry) = self.counts.get_mut(&user_id) {
            match *entry {
                0 => {
                    tracing::warn!(user_id, "Presence count underflow, clamping to zero");
                    remove = true;
                }
                1 => {
                    *entry = 0;
                    went_offline = true;
                    remove = true;
                }
                _ => *entry -= 1,
            }
        } else {
            tracing::warn!(user_id, "Disconnect for untracked user");
        }
        if remove {
            self.counts.remove_if(&user_id, |_, count| *count == 0);
        }
        went_offline
    }

    /// Whether the user currently holds at least one connection.
    pub fn is_online(&self, user_id: i64) -> bool {
        self.counts.get(&user_id).map(|c| *c > 0).unwrap_or(false)
    }

    /// Active connection count for a user.
    pub fn online_count(&self, user_id: i64) -> u32 {
        self.counts.get(&user_id).map(|c| *c).unwrap_or(0)
    }
}
