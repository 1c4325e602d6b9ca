//! Wire Protocol
//!
//! Commands and events exchanged over one persistent JSON channel per client.
//! Commands form a closed tagged-variant type consumed by a single dispatch
//! function per connection, which preserves per-connection ordering.

use serde::{Deserialize, Serialize};

use crate::domain::Message;

/// Client-invoked commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Handshake: presents the bearer credential. Must be the first frame on
    /// a new connection; no other command is accepted before it succeeds.
    Identify { token: String },

    /// Subscribe to a room's events (authorization checked server-side).
    JoinRoom { room_id: i64 },

    /// Unsubscribe from a room. Idempotent.
    LeaveRoom { room_id: i64 },

    /// Persist a message, then fan it out to the room.
    SendMessage {
        room_id: i64,
        content: String,
        #[serde(default = "default_message_type")]
        message_type: String,
    },

    /// Ephemeral typing signal, fanned out to the room minus the sender.
    TypingStart { room_id: i64 },

    /// Ephemeral typing-stopped signal.
    TypingStop { room_id: i64 },
}

fn default_message_type() -> String {
    "text".to_string()
}

/// Server-pushed events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Handshake accepted; the connection is registered.
    Ready { user_id: i64, connection_id: String },

    /// A user's presence transitioned 0 -> 1 active connections.
    UserOnline { user_id: i64 },

    /// A user's presence transitioned 1 -> 0 active connections.
    UserOffline { user_id: i64 },

    /// Join succeeded. Delivered to the caller only.
    JoinedRoom { room_id: i64 },

    /// Leave completed. Delivered to the caller only.
    LeftRoom { room_id: i64 },

    /// A persisted message, fanned out to every current room member.
    ReceiveMessage { message: Message },

    /// Typing state change for a room member.
    UserTyping {
        room_id: i64,
        user_id: i64,
        is_typing: bool,
    },

    /// A command failed. Delivered to the caller only.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn send_message_defaults_to_text() {
        let cmd: ClientCommand =
            serde_json::from_str(r#"{"type":"send_message","data":{"room_id":7,"content":"hi"}}"#)
                .unwrap();
        assert_eq!(
            cmd,
            ClientCommand::SendMessage {
                room_id: 7,
                content: "hi".into(),
                message_type: "text".into(),
            }
        );
    }

    #[test]
    fn events_use_snake_case_tags() {
        let json = serde_json::to_value(ServerEvent::UserTyping {
            room_id: 3,
            user_id: 9,
            is_typing: true,
        })
        .unwrap();
        assert_eq!(json["type"], "user_typing");
        assert_eq!(json["data"]["is_typing"], true);
    }

    #[test]
    fn identify_round_trips() {
        let cmd = ClientCommand::Identify {
            token: "bearer-token".into(),
        };
        let text = serde_json::to_string(&cmd).unwrap();
        let back: ClientCommand = serde_json::from_str(&text).unwrap();
        assert_eq!(back, cmd);
    }
}
