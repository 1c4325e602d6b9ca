//! Domain layer: the message entity and the collaborator traits the
//! real-time core consumes.

pub mod collaborators;
pub mod message;

pub use collaborators::{AuthVerifier, ChatDirectory, MessageStore};
pub use message::{Message, MessageType};
