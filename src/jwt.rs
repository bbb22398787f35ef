//! Access token signing and verification.
//!
//! Access tokens are short-lived, stateless HS256 JWTs carrying the user id and
//! roles. They are never stored server-side; validity is purely a function of
//! the signature and the `exp` claim.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: String,
    /// Roles granted to the subject
    pub roles: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Signing keys derived from the process-wide secret.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The JWT token string
    pub token: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Sign an access token for `subject` valid for `ttl_secs` seconds.
    pub fn issue_access_token(
        &self,
        subject: &str,
        roles: &[String],
        ttl_secs: u64,
    ) -> Result<AccessToken, JwtError> {
        let now = unix_now();
        let exp = now
            .checked_add(ttl_secs)
            .filter(|exp| i64::try_from(*exp).is_ok())
            .ok_or(JwtError::LifetimeOutOfRange(ttl_secs))?;

        let claims = AccessClaims {
            sub: subject.to_string(),
            roles: roles.to_vec(),
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(AccessToken {
            token,
            issued_at: now,
            expires_at: exp,
            duration: ttl_secs,
        })
    }

    /// Validate and decode an access token.
    ///
    /// The signature is checked before the expiry, so a token that is both
    /// tampered and expired reports `Invalid`.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e),
            })
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    /// Signature valid but `exp` is in the past.
    #[error("Token expired")]
    Expired,
    /// Bad signature, malformed structure or missing claims.
    #[error("Invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
    #[error("Token lifetime of {0}s overflows the expiry timestamp")]
    LifetimeOutOfRange(u64),
}
