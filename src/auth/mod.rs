//! JWT authentication with role-based access control.
//!
//! Dual-token system: short-lived access tokens (stateless JWTs) and
//! long-lived refresh tokens (opaque, database-tracked, single use).
//! Protected routes only ever look at the access token; renewing it is the
//! client's job via `/refresh`.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;
mod types;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, bearer_token, build_cookie, clear_cookie,
    clear_session_cookies, get_cookie, session_cookies,
};
pub use errors::{AuthError, AuthErrorKind, ResultExt, UnauthenticatedReason};
pub use extractors::{Admin, Auth, RequireRole, RoleConstraint, authenticate, require_auth};
pub use ip::{HasHeadersAndExtensions, extract_client_ip};
pub use state::HasAuthBackend;
pub use types::Identity;
