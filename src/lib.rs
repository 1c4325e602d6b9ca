//! # Social Gateway Library
//!
//! This crate provides the real-time core of a social networking
//! application:
//! - WebSocket gateway multiplexing many concurrent client connections
//! - Multi-device presence tracking with transition-edge broadcasts
//! - Authorized room membership and message fan-out
//! - Ephemeral typing indicators
//! - A reconnecting client controller that re-subscribes joined rooms
//!
//! Persisted-entity CRUD, token minting, and the relational schema are
//! external collaborators, consumed through the traits in [`domain`].
//!
//! ## Module Structure
//!
//! ```text
//! social_gateway/
//! +-- config/         Configuration management
//! +-- domain/         Message entity and collaborator traits
//! +-- infrastructure/ JWT verifier and PostgreSQL collaborators
//! +-- gateway/        Session registry, presence, rooms, typing, hub,
//! |                   wire protocol, and the WebSocket handler
//! +-- client/         Reconnection & state-reconciliation controller
//! +-- shared/         Common utilities (error taxonomy)
//! ```

// Configuration module
pub mod config;

// Domain layer - entity and collaborator traits
pub mod domain;

// Infrastructure layer - external implementations
pub mod infrastructure;

// Real-time gateway core
pub mod gateway;

// Client-side reconnection controller
pub mod client;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
