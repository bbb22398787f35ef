//! Access token middleware and axum extractors.

use std::marker::PhantomData;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::cookie::{ACCESS_COOKIE_NAME, bearer_token, get_cookie};
use super::errors::{AuthError, UnauthenticatedReason};
use super::state::HasAuthBackend;
use super::types::Identity;
use crate::db::ADMIN_ROLE;
use crate::jwt::JwtConfig;

/// Locate the access credential: the `accessToken` cookie first, then an
/// `Authorization: Bearer` header.
fn access_credential(headers: &HeaderMap) -> Option<&str> {
    get_cookie(headers, ACCESS_COOKIE_NAME)
        .filter(|value| !value.is_empty())
        .or_else(|| bearer_token(headers))
}

/// Verify the request's access credential. Touches no storage.
pub fn authenticate(headers: &HeaderMap, jwt: &JwtConfig) -> Result<Identity, AuthError> {
    let token = access_credential(headers).ok_or_else(|| {
        AuthError::unauthenticated(UnauthenticatedReason::MissingCredential)
    })?;

    let claims = jwt.verify_access_token(token).map_err(|e| {
        debug!(error = %e, "Access token rejected");
        AuthError::from(e)
    })?;

    Ok(Identity::from(claims))
}

/// Middleware rejecting requests without a valid access token.
/// On success the caller's [`Identity`] is attached to request extensions.
///
/// ```ignore
/// router.route_layer(middleware::from_fn_with_state(state, require_auth::<MyState>))
/// ```
pub async fn require_auth<S>(
    State(state): State<S>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    S: HasAuthBackend + Clone + Send + Sync + 'static,
{
    let identity = authenticate(request.headers(), state.jwt())?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Extractor for the authenticated caller.
/// Reuses the identity attached by `require_auth`, verifying the token itself
/// when used on a route without the layer.
pub struct Auth(pub Identity);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(Auth(identity.clone()));
        }
        authenticate(&parts.headers, state.jwt()).map(Auth)
    }
}

/// A role a caller must hold, checked by [`RequireRole`].
pub trait RoleConstraint: Send + Sync {
    const ROLE: &'static str;
}

/// Administrators only.
pub struct Admin;

impl RoleConstraint for Admin {
    const ROLE: &'static str = ADMIN_ROLE;
}

/// Extractor for endpoints restricted to a role.
/// Fails with 401 when unauthenticated and 403 when the role is missing.
pub struct RequireRole<R: RoleConstraint>(pub Identity, PhantomData<R>);

impl<R: RoleConstraint> RequireRole<R> {
    pub fn identity(&self) -> &Identity {
        &self.0
    }
}

impl<S, R> FromRequestParts<S> for RequireRole<R>
where
    S: HasAuthBackend + Send + Sync,
    R: RoleConstraint,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(identity) = Auth::from_request_parts(parts, state).await?;

        if !identity.has_role(R::ROLE) {
            debug!(user_id = %identity.id, role = R::ROLE, "Role check failed");
            return Err(AuthError::insufficient_role());
        }

        Ok(RequireRole(identity, PhantomData))
    }
}
