//! Token management API endpoints.
//!
//! - POST `/refresh` - Exchange the refresh token for a new pair (single use)
//! - POST `/logout` - Revoke the presented refresh token and clear cookies
//! - POST `/logout-all` - Revoke every refresh token of the caller
//! - GET `/sessions` - List the caller's live refresh tokens

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::ApiState;
use crate::auth::{
    Auth, AuthError, AuthErrorKind, REFRESH_COOKIE_NAME, clear_session_cookies, get_cookie,
    session_cookies,
};
use crate::db::RefreshTokenSummary;

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
}

#[derive(Serialize)]
struct RevokeResponse {
    revoked: u64,
}

#[derive(Serialize)]
struct ListSessionsResponse {
    sessions: Vec<RefreshTokenSummary>,
}

/// Rotate the refresh token. A rejected session also clears both cookies so
/// the client stops presenting them.
pub(super) async fn refresh(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let secure = state.settings.secure_cookies;

    match state
        .sessions
        .refresh(get_cookie(&headers, REFRESH_COOKIE_NAME))
        .await
    {
        Ok(session) => (
            StatusCode::OK,
            session_cookies(&session, secure),
            Json(SuccessResponse { success: true }),
        )
            .into_response(),
        Err(e) if e.kind() == AuthErrorKind::SessionRejected => {
            (clear_session_cookies(secure), e).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Logout - revoke the refresh token (if any) and clear both cookies.
/// Needs no valid access token and never fails for unknown tokens.
pub(super) async fn logout(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthError> {
    state
        .sessions
        .logout(get_cookie(&headers, REFRESH_COOKIE_NAME))
        .await?;

    Ok((
        StatusCode::OK,
        clear_session_cookies(state.settings.secure_cookies),
        Json(SuccessResponse { success: true }),
    ))
}

pub(super) async fn logout_all(
    State(state): State<ApiState>,
    Auth(identity): Auth,
) -> Result<impl IntoResponse, AuthError> {
    let revoked = state.sessions.sign_out_everywhere(&identity.id).await?;

    Ok((
        StatusCode::OK,
        clear_session_cookies(state.settings.secure_cookies),
        Json(RevokeResponse { revoked }),
    ))
}

pub(super) async fn list_sessions(
    State(state): State<ApiState>,
    Auth(identity): Auth,
) -> Result<impl IntoResponse, AuthError> {
    let sessions = state.sessions.sessions(&identity.id).await?;
    Ok(Json(ListSessionsResponse { sessions }))
}
