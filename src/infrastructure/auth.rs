//! JWT-backed credential verification.
//!
//! The gateway never mints tokens; it only verifies the bearer credential
//! minted by the authentication service.

use async_trait::async_trait;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

use crate::domain::AuthVerifier;
use crate::shared::GatewayError;

/// Claims carried by the access token.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
}

/// HS256 token verifier.
pub struct JwtAuthVerifier {
    decoding_key: DecodingKey,
}

impl JwtAuthVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[async_trait]
impl AuthVerifier for JwtAuthVerifier {
    async fn verify(&self, credential: &str) -> Result<i64, GatewayError> {
        let token_data = decode::<Claims>(credential, &self.decoding_key, &Validation::default())
            .map_err(|e| GatewayError::Auth(format!("Invalid token: {}", e)))?;

        token_data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|e| GatewayError::Auth(format!("Invalid user ID in token: {}", e)))
    }
}
