//! Infrastructure layer: concrete implementations of the collaborator
//! traits the gateway consumes.

pub mod auth;
pub mod postgres;

pub use auth::JwtAuthVerifier;
pub use postgres::{create_pool, PgChatDirectory, PgMessageStore};
