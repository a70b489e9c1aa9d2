//! Application state management
//!
//! Contains shared state accessible across all handlers. Everything here is
//! read-only after startup; the staff directory does its own locking.

use crate::auth::TokenKeys;
use crate::config::AuthConfig;
use crate::staff::StaffDirectory;
use chrono::Duration;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Staff lookup used at login, refresh and auth checks
    pub staff: Arc<dyn StaffDirectory>,

    /// Signing keys built once from the configured secret
    pub tokens: Arc<TokenKeys>,

    /// Cost used when hashing new passwords
    pub bcrypt_cost: u32,

    /// Re-read email and role from the directory when refreshing
    pub refresh_resolves_identity: bool,

    /// Verified against when a login email is unknown
    dummy_hash: OnceCell<String>,
}

impl AppState {
    pub fn new(staff: Arc<dyn StaffDirectory>, auth: &AuthConfig) -> Self {
        let tokens = TokenKeys::with_ttls(
            &auth.jwt_secret,
            Duration::seconds(auth.access_ttl_secs),
            Duration::seconds(auth.refresh_ttl_secs),
        );

        Self {
            staff,
            tokens: Arc::new(tokens),
            bcrypt_cost: auth.bcrypt_cost,
            refresh_resolves_identity: auth.refresh_resolves_identity,
            dummy_hash: OnceCell::new(),
        }
    }

    /// A hash at the configured cost that no presented password matches.
    pub fn dummy_hash(&self) -> &str {
        self.dummy_hash.get_or_init(|| {
            bcrypt::hash("placeholder-credential", self.bcrypt_cost).unwrap_or_default()
        })
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
