//! Signed, time-bounded session tokens.
//!
//! Tokens are HS256 JWTs carrying the identity id and an expiry. Nothing is
//! stored server-side: a token stays valid until `exp`, and validation never
//! trusts a claim before the signature has been checked.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::server::config::ServerConfig;

pub const TOKEN_LIFETIME_DAYS: i64 = 30;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing secret is empty")]
    MissingSecret,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token is not a well-formed JWT")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("token claims are missing or of the wrong type")]
    MalformedClaims,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: i32,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(config: &ServerConfig) -> Result<Self, TokenError> {
        Self::from_secret(config.jwt_secret.as_bytes())
    }

    pub fn from_secret(secret: &[u8]) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        // Expiry is checked against the caller's clock, not the library's.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    pub fn issue(&self, identity_id: i32, now: DateTime<Utc>) -> Result<String, TokenError> {
        let claims = Claims {
            sub: identity_id.to_string(),
            user_id: identity_id,
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Returns the identity id carried by `token` if the signature matches,
    /// the token has not expired at `now`, and the id claim is present.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<i32, TokenError> {
        let token_data = decode::<Value>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                _ => TokenError::Malformed,
            },
        )?;
        let claims = token_data.claims;

        let expires_at = claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or(TokenError::MalformedClaims)?;
        if expires_at <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        claims
            .get("user_id")
            .and_then(Value::as_i64)
            .and_then(|id| i32::try_from(id).ok())
            .ok_or(TokenError::MalformedClaims)
    }
}
