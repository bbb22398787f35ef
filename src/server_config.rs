//! Immutable server settings built once at startup.
//!
//! Every component receives these by constructor injection (usually as an
//! `Arc<ServerSettings>`); nothing reads configuration from global state while
//! serving requests.

/// Default access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 15 * 60;

/// Default refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Longest lifetime accepted for either token: 1 year.
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Lowest bcrypt cost accepted.
pub const MIN_HASH_COST: u32 = 4;

/// Highest bcrypt cost accepted.
pub const MAX_HASH_COST: u32 = 31;

#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Access token lifetime in seconds
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds
    pub refresh_ttl_secs: u64,
    /// bcrypt cost factor for new password hashes
    pub hash_cost: u32,
    /// Whether cookies get `Secure; SameSite=None` (HTTPS deployments)
    pub secure_cookies: bool,
    /// Whether to read the client IP from X-Forwarded-For
    pub trust_proxy: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            hash_cost: bcrypt::DEFAULT_COST,
            secure_cookies: false,
            trust_proxy: false,
        }
    }
}

impl ServerSettings {
    /// Check the invariants the token lifecycle relies on.
    pub fn validate(&self) -> Result<(), String> {
        if self.access_ttl_secs == 0 {
            return Err("Access token TTL must be greater than zero".to_string());
        }

        if self.refresh_ttl_secs > MAX_TTL_SECS {
            return Err(format!(
                "Refresh token TTL ({}s) must not exceed {}s",
                self.refresh_ttl_secs, MAX_TTL_SECS
            ));
        }

        if self.refresh_ttl_secs <= self.access_ttl_secs {
            return Err(format!(
                "Refresh token TTL ({}s) must be longer than access token TTL ({}s)",
                self.refresh_ttl_secs, self.access_ttl_secs
            ));
        }

        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.hash_cost) {
            return Err(format!(
                "Hash cost must be between {} and {}, got {}",
                MIN_HASH_COST, MAX_HASH_COST, self.hash_cost
            ));
        }

        Ok(())
    }
}
