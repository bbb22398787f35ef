//! Rate limiting for credential endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password
//! guessing and signup spam.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};
use tracing::warn;

use crate::auth::{AuthError, extract_client_ip};

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

const LOGIN_PER_SEC: NonZeroU32 = NonZeroU32::MIN;
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();
const REGISTER_PER_MIN: NonZeroU32 = NonZeroU32::new(3).unwrap();

/// Rate limiting configuration for credential endpoints.
pub struct RateLimitConfig {
    /// Per-IP limiter for login (5 burst, then 1 per second)
    pub login: IpLimiter,
    /// Per-IP limiter for registration (3 per minute)
    pub register: IpLimiter,
    /// Read the client IP from X-Forwarded-For
    trust_proxy: bool,
}

impl RateLimitConfig {
    pub fn new(trust_proxy: bool) -> Self {
        Self::with_quotas(
            Quota::per_second(LOGIN_PER_SEC).allow_burst(LOGIN_BURST),
            Quota::per_minute(REGISTER_PER_MIN),
            trust_proxy,
        )
    }

    pub fn with_quotas(login: Quota, register: Quota, trust_proxy: bool) -> Self {
        Self {
            login: RateLimiter::keyed(login),
            register: RateLimiter::keyed(register),
            trust_proxy,
        }
    }

    /// Forget clients whose quota has fully replenished.
    pub fn retain_recent(&self) {
        self.login.retain_recent();
        self.register.retain_recent();
    }

    /// Number of per-IP entries held across both limiters.
    pub fn tracked_clients(&self) -> usize {
        self.login.len() + self.register.len()
    }
}

async fn check(
    limiter: &IpLimiter,
    trust_proxy: bool,
    message: &'static str,
    request: Request,
    next: Next,
) -> Response {
    let ip = match extract_client_ip(&request, trust_proxy) {
        Ok(ip) => ip,
        Err(reason) => {
            warn!(reason, "Unable to determine client IP");
            return AuthError::unknown_client().into_response();
        }
    };

    match limiter.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            warn!(ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
            AuthError::rate_limited(message).into_response()
        }
    }
}

/// Middleware for rate limiting login.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    check(
        &config.login,
        config.trust_proxy,
        "Too many login attempts. Please wait before trying again.",
        request,
        next,
    )
    .await
}

/// Middleware for rate limiting registration.
pub async fn rate_limit_register(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    check(
        &config.register,
        config.trust_proxy,
        "Too many signup attempts. Please wait before trying again.",
        request,
        next,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_login_burst_then_blocked() {
        let config = RateLimitConfig::new(false);
        let ip = "198.51.100.1".to_string();

        for _ in 0..LOGIN_BURST.get() {
            assert!(config.login.check_key(&ip).is_ok());
        }
        assert!(config.login.check_key(&ip).is_err());
        // Other clients are unaffected
        assert!(config.login.check_key(&"198.51.100.2".to_string()).is_ok());
    }

    #[test]
    fn test_register_quota() {
        let config = RateLimitConfig::new(false);
        let ip = "198.51.100.1".to_string();

        for _ in 0..REGISTER_PER_MIN.get() {
            assert!(config.register.check_key(&ip).is_ok());
        }
        assert!(config.register.check_key(&ip).is_err());
    }

    #[test]
    fn test_retain_recent_forgets_replenished_clients() {
        let quota = Quota::with_period(Duration::from_millis(10)).unwrap();
        let config = RateLimitConfig::with_quotas(quota, quota, false);

        assert!(config.login.check_key(&"198.51.100.1".to_string()).is_ok());
        assert!(config.login.check_key(&"198.51.100.2".to_string()).is_ok());
        assert!(config.register.check_key(&"198.51.100.1".to_string()).is_ok());
        assert_eq!(config.tracked_clients(), 3);

        std::thread::sleep(Duration::from_millis(50));
        config.retain_recent();

        assert_eq!(config.tracked_clients(), 0);
    }

    #[test]
    fn test_retain_recent_keeps_limited_clients() {
        let config = RateLimitConfig::new(false);
        let ip = "198.51.100.1".to_string();

        for _ in 0..REGISTER_PER_MIN.get() {
            assert!(config.register.check_key(&ip).is_ok());
        }
        config.retain_recent();

        assert_eq!(config.register.len(), 1);
        assert!(config.register.check_key(&ip).is_err());
    }
}
