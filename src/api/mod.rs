mod accounts;
mod admin;
mod tokens;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;

use crate::auth::require_auth;
use crate::jwt::JwtConfig;
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_register};
use crate::server_config::ServerSettings;
use crate::session::SessionIssuer;

/// State shared by every API handler.
#[derive(Clone)]
pub struct ApiState {
    pub sessions: SessionIssuer,
    pub jwt: Arc<JwtConfig>,
    pub settings: Arc<ServerSettings>,
}

crate::impl_has_auth_backend!(ApiState);

/// Create the API router.
///
/// Public routes: `/register`, `/login`, `/refresh`, `/logout`.
/// Everything else sits behind `require_auth`.
pub fn create_api_router(
    sessions: SessionIssuer,
    jwt: Arc<JwtConfig>,
    settings: Arc<ServerSettings>,
    rate_limit: Option<Arc<RateLimitConfig>>,
) -> Router {
    let state = ApiState {
        sessions,
        jwt,
        settings,
    };

    let mut register = post(accounts::register);
    let mut login = post(accounts::login);
    if let Some(config) = rate_limit {
        register = register.route_layer(middleware::from_fn_with_state(
            config.clone(),
            rate_limit_register,
        ));
        login = login.route_layer(middleware::from_fn_with_state(config, rate_limit_login));
    }

    let protected = Router::new()
        .route("/me", get(accounts::me))
        .route("/logout-all", post(tokens::logout_all))
        .route("/sessions", get(tokens::list_sessions))
        .route(
            "/admin/users/{id}/sessions",
            delete(admin::revoke_user_sessions),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<ApiState>,
        ));

    Router::new()
        .route("/register", register)
        .route("/login", login)
        .route("/refresh", post(tokens::refresh))
        .route("/logout", post(tokens::logout))
        .merge(protected)
        .with_state(state)
}
