//! Reconnection & state-reconciliation controller.
//!
//! The client-side counterpart to the gateway: detects connection loss,
//! reconnects with jittered exponential backoff, and re-subscribes to
//! previously joined rooms once the new connection is ready.

pub mod connection;
pub mod state;

pub use connection::{ClientError, GatewayClient};
pub use state::{ConnectionState, ReconnectConfig};
