//! Gateway Error Types
//!
//! Centralized error taxonomy for the real-time core.

/// Gateway error type.
///
/// Every command failure is reported only to the connection that issued the
/// command; errors never cross into another connection's event stream.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Bad or missing credential at handshake. The connection is refused
    /// before any other component observes it.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Join attempted by a user who is not a participant of the room.
    /// Nothing is mutated.
    #[error("Access denied to room")]
    Denied,

    /// The message store rejected a write. No dispatch happens.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// An operation referenced an unknown connection or room where the
    /// operation is not idempotent.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for GatewayError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => GatewayError::NotFound("row not found".into()),
            other => GatewayError::Persistence(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(GatewayError::Denied.to_string(), "Access denied to room");
        assert_eq!(
            GatewayError::Auth("expired".into()).to_string(),
            "Authentication failed: expired"
        );
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: GatewayError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }
}
