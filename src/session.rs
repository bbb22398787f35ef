//! Session issuance and the register/login/refresh/logout flows.
//!
//! A session is one refresh token row plus one access token for the same
//! user. Refresh tokens are single use: `refresh` consumes the presented value
//! atomically before a replacement pair is issued.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::auth::{AuthError, ResultExt, UnauthenticatedReason};
use crate::db::{DEFAULT_ROLE, Database, RefreshToken, RefreshTokenStore, RefreshTokenSummary, User};
use crate::jwt::{AccessToken, JwtConfig, unix_now};
use crate::password::{hash_password, validate_password, verify_password};
use crate::server_config::ServerSettings;

/// Longest email address accepted (RFC 5321 path limit).
const MAX_EMAIL_LENGTH: usize = 254;

/// Verified against when the email is unknown, so a login miss costs one
/// bcrypt verification like a hit does.
const DUMMY_PASSWORD: &str = "dummy-password-for-timing";

/// A freshly issued credential pair.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub refresh: RefreshToken,
    pub access: AccessToken,
}

#[derive(Clone)]
pub struct SessionIssuer {
    db: Database,
    jwt: Arc<JwtConfig>,
    settings: Arc<ServerSettings>,
    dummy_hash: Arc<OnceCell<String>>,
}

/// Trim and lowercase an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Minimal shape check on an already normalized email.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    if email.is_empty() {
        return Err(AuthError::bad_request("Email is required"));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(AuthError::bad_request("Email is too long"));
    }
    if email.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(AuthError::bad_request("Email contains invalid characters"));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(AuthError::bad_request("Invalid email address"));
    }

    Ok(())
}

impl SessionIssuer {
    pub fn new(db: Database, jwt: Arc<JwtConfig>, settings: Arc<ServerSettings>) -> Self {
        Self {
            db,
            jwt,
            settings,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    fn tokens(&self) -> RefreshTokenStore {
        self.db.tokens()
    }

    /// Issue a new session for `user`: exactly one new refresh row and one
    /// access token.
    pub async fn issue(&self, user: &User) -> Result<Session, AuthError> {
        // Sign first so a signing failure leaves no orphaned refresh row
        let access =
            self.jwt
                .issue_access_token(&user.id, &user.roles, self.settings.access_ttl_secs)?;

        let refresh = self
            .tokens()
            .create(&user.id, self.settings.refresh_ttl_secs)
            .await
            .db_err("Failed to store refresh token")?;

        Ok(Session {
            user_id: user.id.clone(),
            refresh,
            access,
        })
    }

    /// Create an account and sign it in.
    pub async fn register(&self, email: &str, password: &str) -> Result<(User, Session), AuthError> {
        let email = normalize_email(email);
        validate_email(&email)?;
        validate_password(password)?;

        // Cheap pre-check; the unique index below catches concurrent inserts
        if self
            .db
            .users()
            .get_by_email(&email)
            .await
            .db_err("Failed to look up user")?
            .is_some()
        {
            return Err(AuthError::conflict());
        }

        let password_hash = hash_password(password, self.settings.hash_cost).await?;

        let user = self
            .db
            .users()
            .create(&email, &password_hash, &[DEFAULT_ROLE.to_string()])
            .await
            .map_err(|e| {
                if e.as_database_error()
                    .is_some_and(|db_err| db_err.is_unique_violation())
                {
                    AuthError::conflict()
                } else {
                    AuthError::internal("Failed to create user", e)
                }
            })?;

        let session = self.issue(&user).await?;
        info!(user_id = %user.id, "User registered");
        Ok((user, session))
    }

    /// Check credentials, revoke every existing refresh token of the user and
    /// issue a fresh session.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, Session), AuthError> {
        let email = normalize_email(email);

        let user = self
            .db
            .users()
            .get_by_email(&email)
            .await
            .db_err("Failed to look up user")?;

        let Some(user) = user else {
            let dummy = self
                .dummy_hash
                .get_or_try_init(|| hash_password(DUMMY_PASSWORD, self.settings.hash_cost))
                .await?;
            verify_password(password, dummy).await?;
            return Err(AuthError::invalid_credentials());
        };

        if !verify_password(password, &user.password_hash).await? {
            info!(user_id = %user.id, "Login failed: wrong password");
            return Err(AuthError::invalid_credentials());
        }

        // Must finish before the new token exists
        let revoked = self
            .tokens()
            .delete_all_for_user(&user.id)
            .await
            .db_err("Failed to revoke previous sessions")?;

        let session = self.issue(&user).await?;
        info!(user_id = %user.id, revoked, "User logged in");
        Ok((user, session))
    }

    /// Rotate a refresh token: consume the presented value and issue a new
    /// pair. A value that was already used, expired or never existed is
    /// rejected.
    pub async fn refresh(&self, value: Option<&str>) -> Result<Session, AuthError> {
        let value = value.filter(|v| !v.is_empty()).ok_or_else(|| {
            AuthError::unauthenticated(UnauthenticatedReason::MissingCredential)
        })?;

        let consumed = self
            .tokens()
            .consume(value)
            .await
            .db_err("Failed to consume refresh token")?
            .ok_or_else(|| {
                warn!("Unknown or reused refresh token presented");
                AuthError::session_rejected()
            })?;

        if consumed.is_expired_at(unix_now()) {
            info!(user_id = %consumed.user_id, "Expired refresh token presented");
            return Err(AuthError::session_rejected());
        }

        let user = self
            .db
            .users()
            .get_by_id(&consumed.user_id)
            .await
            .db_err("Failed to look up user")?
            .ok_or_else(|| {
                warn!(user_id = %consumed.user_id, "Refresh token for missing user");
                AuthError::session_rejected()
            })?;

        self.issue(&user).await
    }

    /// Delete the presented refresh token, if any. Always succeeds for
    /// unknown values.
    pub async fn logout(&self, value: Option<&str>) -> Result<bool, AuthError> {
        match value.filter(|v| !v.is_empty()) {
            Some(value) => self
                .tokens()
                .delete_by_value(value)
                .await
                .db_err("Failed to delete refresh token"),
            None => Ok(false),
        }
    }

    /// Delete every refresh token of a user.
    pub async fn sign_out_everywhere(&self, user_id: &str) -> Result<u64, AuthError> {
        let revoked = self
            .tokens()
            .delete_all_for_user(user_id)
            .await
            .db_err("Failed to revoke sessions")?;
        info!(user_id = %user_id, revoked, "Sessions revoked");
        Ok(revoked)
    }

    /// Live refresh tokens of a user, newest first.
    pub async fn sessions(&self, user_id: &str) -> Result<Vec<RefreshTokenSummary>, AuthError> {
        self.tokens()
            .list_by_user(user_id)
            .await
            .db_err("Failed to list sessions")
    }
}
