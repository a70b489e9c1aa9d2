//! Authentication and authorization module
//!
//! Provides JWT-based authentication and role-based access control.

mod jwt;
mod middleware;
mod password;
mod refresh;

pub use jwt::{AccessClaims, TokenKeys, TokenPair, ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS};
pub use middleware::{authenticate, authorize, AllowedRoles, CurrentUser};
pub use password::{hash_password, verify_password};
pub use refresh::{refresh_access_token, refresh_with_directory};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Staff roles for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    #[serde(rename = "SSA")]
    Ssa,
    Director,
    Staff,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Ssa, Role::Director, Role::Staff];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Ssa => "SSA",
            Role::Director => "Director",
            Role::Staff => "Staff",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Exact match only; labels are case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
