//! Authentication route handlers
//!
//! Provides login, refresh, auth check and change-password endpoints.

use crate::auth::{
    hash_password, refresh_access_token, refresh_with_directory, verify_password, CurrentUser,
    Role, TokenPair,
};
use crate::error::{ApiResult, AppError, AuthError};
use crate::staff::StaffProfile;
use crate::state::SharedState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

// ============================================
// Request/Response Types
// ============================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    #[validate(length(min = 8))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub data: StaffProfile,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub message: String,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthCheckData {
    pub id: i64,
    pub email: String,
    pub agent_id: String,
    pub role: Role,
    pub must_change_password: bool,
}

#[derive(Debug, Serialize)]
pub struct AuthCheckResponse {
    pub success: bool,
    pub message: String,
    pub data: AuthCheckData,
}

/// Message-only response (no data)
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Rejection category for logs. `body_text()` echoes field values, which
/// can include a password sent with the wrong JSON type.
fn rejection_kind(rejection: &JsonRejection) -> &'static str {
    match rejection {
        JsonRejection::JsonDataError(_) => "json_data",
        JsonRejection::JsonSyntaxError(_) => "json_syntax",
        JsonRejection::MissingJsonContentType(_) => "missing_content_type",
        JsonRejection::BytesRejection(_) => "body_read",
        _ => "other",
    }
}

fn invalid_payload(rejection: JsonRejection) -> AppError {
    warn!(
        kind = rejection_kind(&rejection),
        status = %rejection.status(),
        "Rejected request payload"
    );
    AppError::BadRequest("Invalid request payload".to_string())
}

// ============================================
// Route Handlers
// ============================================

/// POST /api/v1/login
///
/// Authenticate with email and password, receive access and refresh tokens.
pub async fn login(
    State(state): State<SharedState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(req) = payload.map_err(invalid_payload)?;

    let staff = state.staff.find_by_email(&req.email).await?;

    let staff = match staff {
        Some(staff) if verify_password(&staff.password_hash, &req.password) => staff,
        Some(staff) => {
            info!(staff_id = staff.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }
        None => {
            // Same bcrypt cost as a real mismatch.
            verify_password(state.dummy_hash(), &req.password);
            info!("Login failed: unknown email");
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    let tokens = state.tokens.issue_pair(staff.id, &staff.email, staff.role)?;

    info!(staff_id = staff.id, role = %staff.role, "Login successful");
    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        tokens,
        data: StaffProfile::from(&staff),
    }))
}

/// POST /api/v1/refresh
///
/// Exchange a refresh token for a new access token.
pub async fn refresh(
    State(state): State<SharedState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<RefreshResponse>> {
    let Json(req) = payload.map_err(invalid_payload)?;
    let now = Utc::now();

    let access_token = if state.refresh_resolves_identity {
        refresh_with_directory(&state.tokens, state.staff.as_ref(), &req.refresh_token, now).await?
    } else {
        refresh_access_token(&state.tokens, &req.refresh_token, now)?
    };

    Ok(Json(RefreshResponse {
        success: true,
        message: "New access token generated".to_string(),
        access_token,
    }))
}

/// GET /api/v1/auth
///
/// Confirm the bearer token and return the current staff summary.
pub async fn auth_check(
    State(state): State<SharedState>,
    CurrentUser(claims): CurrentUser,
) -> ApiResult<Json<AuthCheckResponse>> {
    let staff = state
        .staff
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(AuthCheckResponse {
        success: true,
        message: "User authenticated".to_string(),
        data: AuthCheckData {
            id: staff.id,
            email: staff.email,
            agent_id: staff.agent_id,
            role: staff.role,
            must_change_password: staff.must_change_password,
        },
    }))
}

/// POST /api/v1/admin/change-password
pub async fn change_password(
    State(state): State<SharedState>,
    CurrentUser(claims): CurrentUser,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(req) = payload.map_err(invalid_payload)?;

    req.validate().map_err(|_| {
        AppError::Validation("New password must be at least 8 characters long".to_string())
    })?;

    let staff = state
        .staff
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !verify_password(&staff.password_hash, &req.old_password) {
        info!(staff_id = staff.id, "Password change refused: old password incorrect");
        return Err(AuthError::IncorrectOldPassword.into());
    }

    let password_hash = hash_password(&req.new_password, state.bcrypt_cost)?;
    state.staff.update_password(staff.id, &password_hash).await?;

    info!(staff_id = staff.id, "Password updated");
    Ok(Json(MessageResponse {
        success: true,
        message: "Password updated successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::FromRequest, http::Request};

    async fn reject_login(body: &'static str) -> JsonRejection {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/login")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        match Json::<LoginRequest>::from_request(request, &()).await {
            Ok(_) => panic!("payload should be rejected"),
            Err(rejection) => rejection,
        }
    }

    #[tokio::test]
    async fn test_mistyped_password_stays_out_of_logs() {
        let rejection =
            reject_login(r#"{"email":"director@example.org","password":90210555}"#).await;
        assert!(rejection.body_text().contains("90210555"));
        assert_eq!(rejection_kind(&rejection), "json_data");

        let logged = format!("{} {}", rejection_kind(&rejection), rejection.status());
        assert!(!logged.contains("90210555"));

        let error = invalid_payload(rejection);
        assert!(!error.to_string().contains("90210555"));
        assert!(matches!(error, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_rejection_kinds() {
        let rejection = reject_login(r#"{"email":"#).await;
        assert_eq!(rejection_kind(&rejection), "json_syntax");

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/login")
            .body(Body::from(r#"{"email":"a@b.c","password":"x"}"#))
            .unwrap();
        let rejection = Json::<LoginRequest>::from_request(request, &())
            .await
            .err()
            .unwrap();
        assert_eq!(rejection_kind(&rejection), "missing_content_type");
    }
}
