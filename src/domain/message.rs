//! Message entity.
//!
//! Maps to the `messages` table owned by the persistence collaborator. The
//! gateway consumes messages read-only after they have been created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message content types matching the `message_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// A plain text message
    #[default]
    Text,
    /// An image attachment
    Image,
    /// A video attachment
    Video,
    /// A generic file attachment
    File,
    /// An audio clip
    Audio,
}

impl MessageType {
    /// Convert from the wire/database string representation.
    ///
    /// Unknown values fall back to `Text`, matching the command default.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "text" => Self::Text,
            "image" => Self::Image,
            "video" => Self::Video,
            "file" => Self::File,
            "audio" => Self::Audio,
            _ => Self::Text,
        }
    }

    /// Convert to the wire/database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::File => "file",
            Self::Audio => "audio",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted chat message, including the sender display fields needed for
/// live delivery without a second lookup on the receiving side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Primary key assigned by the store
    pub id: i64,

    /// Room (chat) the message belongs to
    pub room_id: i64,

    /// Sender user ID
    pub sender_id: i64,

    /// Sender display name, resolved at creation time
    pub sender_name: String,

    /// Sender avatar URL, if set
    pub sender_avatar: Option<String>,

    /// Message content (up to 2000 characters)
    pub content: String,

    /// Content type
    #[serde(rename = "type")]
    pub message_type: MessageType,

    /// Timestamp assigned by the store
    pub created_at: DateTime<Utc>,
}
