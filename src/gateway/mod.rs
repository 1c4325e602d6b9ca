//! Real-time gateway: session registry, presence tracking, room membership,
//! typing indicators, and the message broadcast pipeline, multiplexed over
//! WebSocket connections.

pub mod handler;
pub mod hub;
pub mod presence;
pub mod protocol;
pub mod registry;
pub mod rooms;
pub mod typing;

pub use hub::GatewayHub;
pub use protocol::{ClientCommand, ServerEvent};
