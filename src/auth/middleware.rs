//! Authentication and authorization middleware
//!
//! `authenticate` validates the bearer access token and attaches the
//! recovered [`AccessClaims`] to the request extensions. `authorize` runs
//! after it and admits only roles from an allow-list fixed when the route
//! is registered.

use crate::auth::{AccessClaims, Role, TokenKeys};
use crate::error::AuthError;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Extract the token from an `Authorization` header value.
///
/// The value must be exactly two whitespace-separated parts, the first
/// being `Bearer` in any letter case.
pub fn parse_bearer(header: &str) -> Result<&str, AuthError> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Require a valid access token.
pub async fn authenticate(
    State(keys): State<Arc<TokenKeys>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    let token = parse_bearer(header)?;

    let claims = keys.validate_access(token, Utc::now()).map_err(|e| {
        debug!(reason = %e, path = %request.uri().path(), "Access token rejected");
        e
    })?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

/// Roles admitted by an [`authorize`] layer.
#[derive(Debug, Clone)]
pub struct AllowedRoles(Arc<[Role]>);

impl AllowedRoles {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(roles.into_iter().collect())
    }

    /// Exact membership. A missing role is never permitted.
    pub fn permits(&self, role: Option<Role>) -> bool {
        role.is_some_and(|role| self.0.contains(&role))
    }
}

/// Require the authenticated role to be in the allow-list.
pub async fn authorize(
    State(allowed): State<AllowedRoles>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = request.extensions().get::<AccessClaims>().ok_or_else(|| {
        warn!(path = %request.uri().path(), "Role check reached without authenticated claims");
        AuthError::MissingIdentity
    })?;

    if !allowed.permits(claims.role) {
        warn!(
            staff_id = claims.sub,
            role = ?claims.role,
            path = %request.uri().path(),
            "Insufficient privileges"
        );
        return Err(AuthError::InsufficientRole);
    }

    Ok(next.run(request).await)
}

/// Identity attached by [`authenticate`], for use in handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AccessClaims);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessClaims>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AuthError::MissingIdentity)
    }
}
