//! Account API endpoints.
//!
//! - POST `/register` - Create an account and start a session
//! - POST `/login` - Start a session, revoking all previous ones
//! - GET `/me` - Identity carried by the access token

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::auth::{Auth, AuthError, session_cookies};
use crate::db::User;

#[derive(Deserialize)]
pub(super) struct Credentials {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct UserInfo {
    id: String,
    email: String,
    roles: Vec<String>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            roles: user.roles.clone(),
        }
    }
}

#[derive(Serialize)]
struct UserResponse {
    user: UserInfo,
}

#[derive(Serialize)]
struct MeResponse {
    id: String,
    roles: Vec<String>,
}

fn credentials(payload: Result<Json<Credentials>, JsonRejection>) -> Result<Credentials, AuthError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AuthError::bad_request(e.body_text()))
}

pub(super) async fn register(
    State(state): State<ApiState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let body = credentials(payload)?;
    let (user, session) = state.sessions.register(&body.email, &body.password).await?;

    Ok((
        StatusCode::CREATED,
        session_cookies(&session, state.settings.secure_cookies),
        Json(UserResponse {
            user: UserInfo::from(&user),
        }),
    ))
}

pub(super) async fn login(
    State(state): State<ApiState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let body = credentials(payload)?;
    let (user, session) = state.sessions.login(&body.email, &body.password).await?;

    Ok((
        StatusCode::OK,
        session_cookies(&session, state.settings.secure_cookies),
        Json(UserResponse {
            user: UserInfo::from(&user),
        }),
    ))
}

pub(super) async fn me(Auth(identity): Auth) -> impl IntoResponse {
    Json(MeResponse {
        id: identity.id,
        roles: identity.roles,
    })
}
