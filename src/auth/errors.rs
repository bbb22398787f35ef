//! Authentication error types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::jwt::JwtError;

/// Why a request carried no usable access credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    MissingCredential,
    InvalidToken,
    /// Signature valid but past `exp`; clients should call `/refresh`.
    TokenExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    BadRequest,
    Conflict,
    InvalidCredentials,
    Unauthenticated(UnauthenticatedReason),
    /// Refresh token unknown, already used, expired or orphaned.
    SessionRejected,
    InsufficientRole,
    /// Per-IP limit on a credential endpoint exceeded.
    RateLimited,
    /// Client IP needed for rate limiting could not be determined.
    UnknownClient,
    Internal,
}

/// Error returned by every authentication flow and endpoint.
#[derive(Debug)]
pub struct AuthError {
    kind: AuthErrorKind,
    /// Client-facing for `BadRequest`, log-only for `Internal`.
    detail: Option<String>,
}

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, msg: &str) -> Result<T, AuthError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, msg: &str) -> Result<T, AuthError> {
        self.map_err(|e| AuthError::internal(msg, e))
    }
}

impl AuthError {
    fn new(kind: AuthErrorKind) -> Self {
        Self { kind, detail: None }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            kind: AuthErrorKind::BadRequest,
            detail: Some(msg.into()),
        }
    }

    pub fn conflict() -> Self {
        Self::new(AuthErrorKind::Conflict)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(AuthErrorKind::InvalidCredentials)
    }

    pub fn unauthenticated(reason: UnauthenticatedReason) -> Self {
        Self::new(AuthErrorKind::Unauthenticated(reason))
    }

    pub fn session_rejected() -> Self {
        Self::new(AuthErrorKind::SessionRejected)
    }

    pub fn insufficient_role() -> Self {
        Self::new(AuthErrorKind::InsufficientRole)
    }

    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self {
            kind: AuthErrorKind::RateLimited,
            detail: Some(msg.into()),
        }
    }

    pub fn unknown_client() -> Self {
        Self::new(AuthErrorKind::UnknownClient)
    }

    /// Log the underlying failure and hide it from the client.
    pub fn internal(context: &str, e: impl std::fmt::Display) -> Self {
        error!(error = %e, "{}", context);
        Self {
            kind: AuthErrorKind::Internal,
            detail: Some(format!("{}: {}", context, e)),
        }
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            AuthErrorKind::Conflict => StatusCode::CONFLICT,
            AuthErrorKind::InvalidCredentials | AuthErrorKind::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            }
            AuthErrorKind::SessionRejected
            | AuthErrorKind::InsufficientRole
            | AuthErrorKind::UnknownClient => StatusCode::FORBIDDEN,
            AuthErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code sent as `code` in the JSON body.
    pub fn code(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::BadRequest => "bad_request",
            AuthErrorKind::Conflict => "conflict",
            AuthErrorKind::InvalidCredentials => "invalid_credentials",
            AuthErrorKind::Unauthenticated(UnauthenticatedReason::MissingCredential) => {
                "missing_credential"
            }
            AuthErrorKind::Unauthenticated(UnauthenticatedReason::InvalidToken) => "invalid_token",
            AuthErrorKind::Unauthenticated(UnauthenticatedReason::TokenExpired) => "token_expired",
            AuthErrorKind::SessionRejected => "session_rejected",
            AuthErrorKind::InsufficientRole => "insufficient_role",
            AuthErrorKind::RateLimited => "rate_limited",
            AuthErrorKind::UnknownClient => "unknown_client",
            AuthErrorKind::Internal => "internal_error",
        }
    }

    fn message(&self) -> String {
        match self.kind {
            AuthErrorKind::BadRequest => self
                .detail
                .clone()
                .unwrap_or_else(|| "Bad request".to_string()),
            AuthErrorKind::Conflict => "Email already registered".to_string(),
            AuthErrorKind::InvalidCredentials => "Invalid email or password".to_string(),
            AuthErrorKind::Unauthenticated(UnauthenticatedReason::MissingCredential) => {
                "Not authenticated".to_string()
            }
            AuthErrorKind::Unauthenticated(UnauthenticatedReason::InvalidToken) => {
                "Invalid token".to_string()
            }
            AuthErrorKind::Unauthenticated(UnauthenticatedReason::TokenExpired) => {
                "Token expired".to_string()
            }
            AuthErrorKind::SessionRejected => "Session rejected".to_string(),
            AuthErrorKind::InsufficientRole => "Insufficient permissions".to_string(),
            AuthErrorKind::RateLimited => self
                .detail
                .clone()
                .unwrap_or_else(|| "Too many requests".to_string()),
            AuthErrorKind::UnknownClient => "Unable to determine client IP".to_string(),
            AuthErrorKind::Internal => "Internal server error".to_string(),
        }
    }

    /// RFC 6750 challenge for 401 responses.
    fn www_authenticate(&self) -> Option<&'static str> {
        match self.kind {
            AuthErrorKind::Unauthenticated(UnauthenticatedReason::MissingCredential) => {
                Some("Bearer")
            }
            AuthErrorKind::Unauthenticated(UnauthenticatedReason::InvalidToken) => {
                Some(r#"Bearer error="invalid_token""#)
            }
            AuthErrorKind::Unauthenticated(UnauthenticatedReason::TokenExpired) => {
                Some(r#"Bearer error="invalid_token", error_description="token_expired""#)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.code(), detail),
            None => f.write_str(self.code()),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => Self::unauthenticated(UnauthenticatedReason::TokenExpired),
            JwtError::Invalid(_) => Self::unauthenticated(UnauthenticatedReason::InvalidToken),
            JwtError::Encoding(e) => Self::internal("Failed to sign access token", e),
            e @ JwtError::LifetimeOutOfRange(_) => {
                Self::internal("Failed to sign access token", e)
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
                code: self.code(),
            }),
        )
            .into_response();

        if let Some(challenge) = self.www_authenticate() {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(challenge),
            );
        }

        response
    }
}
