//! Session refresh
//!
//! Exchanges a refresh token for a fresh access token without
//! re-presenting credentials. Refresh tokens are not tracked, so a token
//! stays usable until it expires.

use crate::auth::TokenKeys;
use crate::error::{AppError, AuthError};
use crate::staff::StaffDirectory;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Mint an access token carrying only the refresh token's subject.
///
/// The result has no email and no role, so it passes authentication but
/// fails every role check until the holder logs in again.
pub fn refresh_access_token(
    keys: &TokenKeys,
    refresh_token: &str,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let claims = keys.validate_refresh(refresh_token, now)?;
    debug!(staff_id = claims.sub, "Refreshing access token without identity lookup");
    keys.issue_access_at(now, claims.sub, None, None)
}

/// Mint an access token with the subject's current email and role.
pub async fn refresh_with_directory(
    keys: &TokenKeys,
    directory: &dyn StaffDirectory,
    refresh_token: &str,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    let claims = keys.validate_refresh(refresh_token, now)?;

    let staff = directory.find_by_id(claims.sub).await?.ok_or_else(|| {
        warn!(staff_id = claims.sub, "Refresh token subject no longer exists");
        AuthError::TokenInvalid("unknown subject".to_string())
    })?;

    debug!(staff_id = staff.id, role = %staff.role, "Refreshing access token");
    Ok(keys.issue_access_at(now, staff.id, Some(&staff.email), Some(staff.role))?)
}
