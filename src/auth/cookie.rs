//! Cookie parsing and construction for session credentials.

use axum::http::{HeaderMap, header};
use axum::response::AppendHeaders;

use crate::session::Session;

/// Cookie name for the access token (short-lived JWT).
pub const ACCESS_COOKIE_NAME: &str = "accessToken";

/// Cookie name for the refresh token (long-lived, database-tracked).
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Extract a cookie value from the Cookie headers.
///
/// HTTP/2 clients may send each cookie in its own header, so all of them are
/// searched.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookie_header| cookie_header.split(';'))
        .filter_map(|part| part.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn attributes(secure: bool) -> &'static str {
    if secure {
        "HttpOnly; Path=/; SameSite=None; Secure"
    } else {
        "HttpOnly; Path=/; SameSite=Strict"
    }
}

/// Build a `Set-Cookie` value for a credential.
pub fn build_cookie(name: &str, value: &str, max_age: u64, secure: bool) -> String {
    format!(
        "{}={}; {}; Max-Age={}",
        name,
        value,
        attributes(secure),
        max_age
    )
}

/// Build a `Set-Cookie` value that removes a credential.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    format!("{}=; {}; Max-Age=0", name, attributes(secure))
}

/// Both credential cookies for a freshly issued session.
pub fn session_cookies(
    session: &Session,
    secure: bool,
) -> AppendHeaders<[(header::HeaderName, String); 2]> {
    let refresh_max_age = session
        .refresh
        .expires_at
        .saturating_sub(session.refresh.issued_at);
    AppendHeaders([
        (
            header::SET_COOKIE,
            build_cookie(
                ACCESS_COOKIE_NAME,
                &session.access.token,
                session.access.duration,
                secure,
            ),
        ),
        (
            header::SET_COOKIE,
            build_cookie(
                REFRESH_COOKIE_NAME,
                &session.refresh.value,
                refresh_max_age,
                secure,
            ),
        ),
    ])
}

/// Headers clearing both credential cookies.
pub fn clear_session_cookies(secure: bool) -> AppendHeaders<[(header::HeaderName, String); 2]> {
    AppendHeaders([
        (header::SET_COOKIE, clear_cookie(ACCESS_COOKIE_NAME, secure)),
        (header::SET_COOKIE, clear_cookie(REFRESH_COOKIE_NAME, secure)),
    ])
}
