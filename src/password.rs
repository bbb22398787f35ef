//! Password hashing and verification using bcrypt.
//!
//! bcrypt is CPU-bound, so both operations run on tokio's blocking pool.

use crate::auth::AuthError;

/// Shortest password accepted at registration, in bytes.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// bcrypt only looks at the first 72 bytes; longer passwords are refused
/// instead of silently truncated.
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Check a new password against the length policy.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::bad_request(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Hash a password with the given bcrypt cost.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::internal("Password hashing task failed", e))?
        .map_err(|e| AuthError::internal("Failed to hash password", e))
}

/// Verify a password against a stored hash.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::internal("Password verification task failed", e))?
        .map_err(|e| AuthError::internal("Failed to verify password", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthErrorKind;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("correct horse", 4).await.unwrap();

        assert!(hash.starts_with("$2"));
        assert!(verify_password("correct horse", &hash).await.unwrap());
        assert!(!verify_password("wrong horse", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let a = hash_password("same password", 4).await.unwrap();
        let b = hash_password("same password", 4).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_malformed_hash_is_internal_error() {
        let err = verify_password("whatever", "not-a-bcrypt-hash")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::Internal);
    }

    #[test]
    fn test_password_length_policy() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password(&"a".repeat(72)).is_ok());
        assert!(validate_password(&"a".repeat(73)).is_err());
    }
}
