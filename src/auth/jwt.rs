//! Bearer token issuing and validation
//! HS256 JWTs carrying the principal; fixed 24 hour lifetime

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::{
    config::SecurityConfig,
    error::AppError,
    models::{Principal, Role},
};

pub const TOKEN_TTL_HOURS: i64 = 24;

/// Token claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User ID
    pub id: i64,
    pub username: String,
    /// Role enum name; anything outside the three known values fails deserialization
    pub role: Role,
    /// Issued at (epoch seconds)
    pub iat: i64,
    /// Expiration (epoch seconds)
    pub exp: i64,
}

/// Issues and decodes bearer tokens. Holds no mutable state, shareable across threads.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(config.jwt_secret.expose_secret().as_bytes())
    }

    pub fn issue(&self, principal: &Principal) -> Result<String, AppError> {
        self.issue_at(principal, Utc::now())
    }

    /// Issue a token as if it had been minted at `now`
    pub fn issue_at(&self, principal: &Principal, now: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            id: principal.id,
            username: principal.username.clone(),
            role: principal.role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        self.encode_claims(&claims)
    }

    pub(crate) fn encode_claims(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode token: {:?}", e);
            AppError::Internal(format!("Failed to encode token: {}", e))
        })
    }

    /// Every failure collapses into `InvalidToken`; the cause is only logged at debug level.
    pub fn decode(&self, token: &str) -> Result<Principal, AppError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {:?}", e.kind());
                AppError::InvalidToken
            })?
            .claims;

        if claims.role == Role::Public {
            tracing::debug!("Token carries a role no user can hold");
            return Err(AppError::InvalidToken);
        }

        Ok(Principal {
            id: claims.id,
            username: claims.username,
            role: claims.role,
        })
    }
}
