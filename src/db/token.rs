//! Refresh token storage.
//!
//! Only refresh tokens are stored in the database; access tokens are stateless.
//! Each token is an opaque random value handed to the client once. The table
//! keeps the SHA-256 digest of that value, never the value itself.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqlitePool;

use crate::jwt::unix_now;

/// Number of random bytes in a refresh token value.
const TOKEN_BYTES: usize = 32;

/// A refresh token. `value` is only known when the caller created or
/// presented it.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub value: String,
    pub user_id: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

impl RefreshToken {
    /// Expired once `now` reaches `expires_at`.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// Stored token metadata, safe to show to its owner.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RefreshTokenSummary {
    pub id: i64,
    pub issued_at: u64,
    pub expires_at: u64,
}

/// Store for managing refresh tokens.
#[derive(Clone)]
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

/// Generate a fresh random token value.
fn generate_value() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Digest under which a token value is stored.
fn digest(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create and persist a new refresh token for a user, valid for
    /// `ttl_secs` seconds.
    pub async fn create(&self, user_id: &str, ttl_secs: u64) -> Result<RefreshToken, sqlx::Error> {
        let value = generate_value();
        let issued_at = unix_now();
        // Stored as INTEGER, so the expiry must fit in an i64
        let expires_at = issued_at
            .checked_add(ttl_secs)
            .filter(|exp| i64::try_from(*exp).is_ok())
            .ok_or_else(|| {
                sqlx::Error::Encode(
                    format!("refresh token lifetime of {}s is out of range", ttl_secs).into(),
                )
            })?;

        sqlx::query(
            "INSERT INTO refresh_tokens (token_hash, user_id, issued_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(digest(&value))
        .bind(user_id)
        .bind(issued_at as i64)
        .bind(expires_at as i64)
        .execute(&self.pool)
        .await?;

        Ok(RefreshToken {
            value,
            user_id: user_id.to_string(),
            issued_at,
            expires_at,
        })
    }

    /// Look up a live token by value. Expired rows are treated as missing
    /// even before the cleanup task removes them.
    pub async fn find_by_value(&self, value: &str) -> Result<Option<RefreshToken>, sqlx::Error> {
        let row: Option<(String, i64, i64)> = sqlx::query_as(
            "SELECT user_id, issued_at, expires_at FROM refresh_tokens WHERE token_hash = ? AND expires_at > ?",
        )
        .bind(digest(value))
        .bind(unix_now() as i64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id, issued_at, expires_at)| RefreshToken {
            value: value.to_string(),
            user_id,
            issued_at: issued_at as u64,
            expires_at: expires_at as u64,
        }))
    }

    /// Atomically delete a token and return the removed row.
    ///
    /// A single `DELETE ... RETURNING` statement, so when several callers race
    /// on the same value exactly one of them receives `Some`. Expired rows are
    /// returned (and removed) too; the caller decides what to do with them.
    pub async fn consume(&self, value: &str) -> Result<Option<RefreshToken>, sqlx::Error> {
        let row: Option<(String, i64, i64)> = sqlx::query_as(
            "DELETE FROM refresh_tokens WHERE token_hash = ? RETURNING user_id, issued_at, expires_at",
        )
        .bind(digest(value))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id, issued_at, expires_at)| RefreshToken {
            value: value.to_string(),
            user_id,
            issued_at: issued_at as u64,
            expires_at: expires_at as u64,
        }))
    }

    /// Delete a token by value. Deleting an unknown value is not an error.
    pub async fn delete_by_value(&self, value: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = ?")
            .bind(digest(value))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all tokens for a user (logout everywhere).
    pub async fn delete_all_for_user(&self, user_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete all expired tokens.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(unix_now() as i64)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// List live tokens for a user, newest first.
    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<RefreshTokenSummary>, sqlx::Error> {
        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(
            "SELECT id, issued_at, expires_at FROM refresh_tokens WHERE user_id = ? AND expires_at > ? ORDER BY id DESC",
        )
        .bind(user_id)
        .bind(unix_now() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, issued_at, expires_at)| RefreshTokenSummary {
                id,
                issued_at: issued_at as u64,
                expires_at: expires_at as u64,
            })
            .collect())
    }

    /// Count every stored row for a user, expired or not.
    pub async fn count_for_user(&self, user_id: &str) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
