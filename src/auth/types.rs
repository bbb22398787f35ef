//! Authenticated identity types.

use crate::jwt::AccessClaims;

/// Caller identity taken from a verified access token.
/// Attached to request extensions by `require_auth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User id (the token subject)
    pub id: String,
    /// Roles granted when the token was issued
    pub roles: Vec<String>,
}

impl Identity {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<AccessClaims> for Identity {
    fn from(claims: AccessClaims) -> Self {
        Self {
            id: claims.sub,
            roles: claims.roles,
        }
    }
}
