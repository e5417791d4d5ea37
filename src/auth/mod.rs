use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;

/// Identity claim embedded in every token. Tokens carry nothing else: a valid
/// token grants access to the bearer's own resources only, and ownership is
/// always checked against this id, never a client-supplied one.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserClaim {
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user: UserClaim,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT secret is not configured")]
    MissingSecret,

    #[error("token generation failed: {0}")]
    Generation(String),

    #[error("invalid token")]
    Invalid,
}

/// Stateless signer/verifier for identity tokens.
///
/// Tokens expire a fixed number of days after issuance (5 by default) and
/// there is no refresh or revocation mechanism; a token stays
/// cryptographically valid until natural expiry.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    expiry_days: i64,
}

impl TokenService {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            expiry_days: config.token_expiry_days,
        }
    }

    /// Sign a token embedding `{user: {id}}`, expiring `expiry_days` from now.
    pub fn issue(&self, user_id: Uuid) -> Result<String, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let now = Utc::now();
        let claims = Claims {
            user: UserClaim { id: user_id },
            iat: now.timestamp(),
            exp: (now + Duration::days(self.expiry_days)).timestamp(),
        };

        let encoding_key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&Header::default(), &claims, &encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded identity id.
    /// A malformed, tampered, or expired token is never partially trusted.
    pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
        if self.secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        let decoding_key = DecodingKey::from_secret(self.secret.as_bytes());
        let token_data = decode::<Claims>(token, &decoding_key, &Validation::default())
            .map_err(|_| TokenError::Invalid)?;

        Ok(token_data.claims.user.id)
    }
}
