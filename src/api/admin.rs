//! Admin API endpoints.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;
use tracing::info;

use super::ApiState;
use crate::auth::{Admin, AuthError, RequireRole};

#[derive(Serialize)]
struct RevokeResponse {
    revoked: u64,
}

/// Revoke every session of a user. Unknown users revoke nothing.
pub(super) async fn revoke_user_sessions(
    State(state): State<ApiState>,
    admin: RequireRole<Admin>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AuthError> {
    if uuid::Uuid::parse_str(&user_id).is_err() {
        return Err(AuthError::bad_request("Invalid user id"));
    }

    let revoked = state.sessions.sign_out_everywhere(&user_id).await?;
    info!(admin_id = %admin.identity().id, user_id = %user_id, revoked, "Admin revoked sessions");

    Ok(Json(RevokeResponse { revoked }))
}
