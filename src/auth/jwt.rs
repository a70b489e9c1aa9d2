//! JWT token management
//!
//! Handles creation and validation of access and refresh tokens.
//! Every token carries a `token_type` tag which is checked before any other
//! claim, so a refresh token never passes as an access token or vice versa.

use crate::auth::Role;
use crate::error::AuthError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Access token lifetime in seconds (15 minutes)
pub const ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;

/// Refresh token lifetime in seconds (7 days)
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Claims as they appear inside the signed payload.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    iat: i64,
    exp: i64,
    token_type: TokenType,
}

/// Identity recovered from a valid access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// Staff id
    pub sub: i64,
    pub email: Option<String>,
    /// `None` only for tokens minted by a refresh that did not re-resolve the role
    pub role: Option<Role>,
    pub iat: i64,
    pub exp: i64,
}

/// Identity recovered from a valid refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    pub sub: i64,
    pub iat: i64,
    pub exp: i64,
}

/// Token pair response
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Signing material and lifetimes, built once from the configured secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    pub fn with_ttls(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's clock in `check_window`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    /// Mint an access token carrying identity and role.
    pub fn issue_access_at(
        &self,
        now: DateTime<Utc>,
        subject: i64,
        email: Option<&str>,
        role: Option<Role>,
    ) -> Result<String, AuthError> {
        let claims = WireClaims {
            sub: subject.to_string(),
            email: email.map(str::to_string),
            role,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
            token_type: TokenType::Access,
        };
        self.sign(&claims)
    }

    /// Mint a refresh token carrying only the subject.
    pub fn issue_refresh_at(&self, now: DateTime<Utc>, subject: i64) -> Result<String, AuthError> {
        let claims = WireClaims {
            sub: subject.to_string(),
            email: None,
            role: None,
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
            token_type: TokenType::Refresh,
        };
        self.sign(&claims)
    }

    /// Create access and refresh tokens for a staff member
    pub fn issue_pair(&self, subject: i64, email: &str, role: Role) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        Ok(TokenPair {
            access_token: self.issue_access_at(now, subject, Some(email), Some(role))?,
            refresh_token: self.issue_refresh_at(now, subject)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    pub fn validate_access(&self, token: &str, now: DateTime<Utc>) -> Result<AccessClaims, AuthError> {
        let claims = self.decode_as(token, TokenType::Access)?;
        check_window(claims.iat, claims.exp, now)?;

        Ok(AccessClaims {
            sub: parse_subject(&claims.sub)?,
            email: claims.email,
            role: claims.role,
            iat: claims.iat,
            exp: claims.exp,
        })
    }

    pub fn validate_refresh(&self, token: &str, now: DateTime<Utc>) -> Result<RefreshClaims, AuthError> {
        let claims = self.decode_as(token, TokenType::Refresh)?;
        if claims.email.is_some() || claims.role.is_some() {
            return Err(AuthError::TokenInvalid("refresh token carries identity fields".to_string()));
        }
        check_window(claims.iat, claims.exp, now)?;

        Ok(RefreshClaims {
            sub: parse_subject(&claims.sub)?,
            iat: claims.iat,
            exp: claims.exp,
        })
    }

    fn sign(&self, claims: &WireClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    fn decode_as(&self, token: &str, expected: TokenType) -> Result<WireClaims, AuthError> {
        let data = decode::<WireClaims>(token, &self.decoding, &self.validation)
            .map_err(|e| AuthError::TokenInvalid(format!("{:?}", e.kind())))?;

        if data.claims.token_type != expected {
            return Err(AuthError::WrongTokenType {
                expected: expected.as_str(),
            });
        }
        Ok(data.claims)
    }
}

fn check_window(iat: i64, exp: i64, now: DateTime<Utc>) -> Result<(), AuthError> {
    if exp <= iat {
        return Err(AuthError::TokenInvalid("expiry not after issue time".to_string()));
    }
    if now.timestamp() >= exp {
        return Err(AuthError::TokenExpired);
    }
    Ok(())
}

fn parse_subject(sub: &str) -> Result<i64, AuthError> {
    match sub.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AuthError::TokenInvalid("malformed subject".to_string())),
    }
}

#[cfg(test)]
impl TokenKeys {
    /// Keys with the default 15 minute / 7 day lifetimes.
    pub(crate) fn new(secret: &str) -> Self {
        Self::with_ttls(
            secret,
            Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            Duration::seconds(REFRESH_TOKEN_TTL_SECS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn keys() -> TokenKeys {
        TokenKeys::new(SECRET)
    }

    /// Read the payload without checking the signature.
    fn peek(token: &str) -> serde_json::Value {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        decode::<serde_json::Value>(token, &DecodingKey::from_secret(b"ignored"), &validation)
            .unwrap()
            .claims
    }

    #[test]
    fn test_access_token_round_trip() {
        let now = Utc::now();
        let token = keys()
            .issue_access_at(now, 42, Some("ada@example.org"), Some(Role::Director))
            .unwrap();

        let claims = keys().validate_access(&token, now + Duration::minutes(1)).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email.as_deref(), Some("ada@example.org"));
        assert_eq!(claims.role, Some(Role::Director));
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_access_token_expires_after_fifteen_minutes() {
        let now = Utc::now();
        let token = keys().issue_access_at(now, 7, Some("a@b.c"), Some(Role::Staff)).unwrap();

        assert!(keys()
            .validate_access(&token, now + Duration::minutes(15) - Duration::seconds(1))
            .is_ok());
        assert_eq!(
            keys().validate_access(&token, now + Duration::minutes(15)),
            Err(AuthError::TokenExpired)
        );
        assert_eq!(
            keys().validate_access(&token, now + Duration::hours(3)),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_token_from_the_past_is_expired_now() {
        let issued = Utc::now() - Duration::minutes(16);
        let token = keys().issue_access_at(issued, 7, None, Some(Role::Staff)).unwrap();
        assert_eq!(keys().validate_access(&token, Utc::now()), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_refresh_token_lives_seven_days() {
        let now = Utc::now();
        let token = keys().issue_refresh_at(now, 9).unwrap();

        let claims = keys().validate_refresh(&token, now + Duration::days(6)).unwrap();
        assert_eq!(claims.sub, 9);
        assert_eq!(
            keys().validate_refresh(&token, now + Duration::days(7)),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn test_different_secret_rejected() {
        let now = Utc::now();
        let token = TokenKeys::new("secret-one")
            .issue_access_at(now, 1, Some("x@y.z"), Some(Role::Admin))
            .unwrap();

        let result = TokenKeys::new("secret-two").validate_access(&token, now);
        assert!(matches!(result, Err(AuthError::TokenInvalid(_))));

        let refresh = TokenKeys::new("secret-one").issue_refresh_at(now, 1).unwrap();
        let result = TokenKeys::new("secret-two").validate_refresh(&refresh, now);
        assert!(matches!(result, Err(AuthError::TokenInvalid(_))));
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let now = Utc::now();
        let access = keys().issue_access_at(now, 3, Some("x@y.z"), Some(Role::Admin)).unwrap();
        let refresh = keys().issue_refresh_at(now, 3).unwrap();

        assert_eq!(
            keys().validate_refresh(&access, now),
            Err(AuthError::WrongTokenType { expected: "refresh" })
        );
        assert_eq!(
            keys().validate_access(&refresh, now),
            Err(AuthError::WrongTokenType { expected: "access" })
        );
    }

    #[test]
    fn test_untagged_token_rejected() {
        #[derive(Serialize)]
        struct Untagged {
            sub: String,
            iat: i64,
            exp: i64,
        }
        let now = Utc::now();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Untagged {
                sub: "5".to_string(),
                iat: now.timestamp(),
                exp: now.timestamp() + 600,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(keys().validate_access(&token, now), Err(AuthError::TokenInvalid(_))));
        assert!(matches!(keys().validate_refresh(&token, now), Err(AuthError::TokenInvalid(_))));
    }

    #[test]
    fn test_refresh_token_with_role_rejected() {
        let now = Utc::now();
        let claims = WireClaims {
            sub: "5".to_string(),
            email: None,
            role: Some(Role::Admin),
            iat: now.timestamp(),
            exp: now.timestamp() + 600,
            token_type: TokenType::Refresh,
        };
        let token = keys().sign(&claims).unwrap();
        assert!(matches!(keys().validate_refresh(&token, now), Err(AuthError::TokenInvalid(_))));
    }

    #[test]
    fn test_malformed_subject_rejected() {
        let now = Utc::now();
        for sub in ["abc", "", "0", "-4", "12.5"] {
            let claims = WireClaims {
                sub: sub.to_string(),
                email: None,
                role: Some(Role::Staff),
                iat: now.timestamp(),
                exp: now.timestamp() + 600,
                token_type: TokenType::Access,
            };
            let token = keys().sign(&claims).unwrap();
            assert!(
                matches!(keys().validate_access(&token, now), Err(AuthError::TokenInvalid(_))),
                "subject {sub:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        #[derive(Serialize)]
        struct Forged<'a> {
            sub: &'a str,
            role: &'a str,
            iat: i64,
            exp: i64,
            token_type: &'a str,
        }
        let now = Utc::now();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Forged {
                sub: "5",
                role: "Superuser",
                iat: now.timestamp(),
                exp: now.timestamp() + 600,
                token_type: "access",
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(keys().validate_access(&token, now), Err(AuthError::TokenInvalid(_))));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let now = Utc::now();
        let claims = WireClaims {
            sub: "5".to_string(),
            email: None,
            role: Some(Role::Admin),
            iat: now.timestamp(),
            exp: now.timestamp() + 600,
            token_type: TokenType::Access,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(keys().validate_access(&token, now), Err(AuthError::TokenInvalid(_))));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let now = Utc::now();
        let staff = keys().issue_access_at(now, 5, None, Some(Role::Staff)).unwrap();
        let admin = keys().issue_access_at(now, 5, None, Some(Role::Admin)).unwrap();

        let staff_parts: Vec<&str> = staff.split('.').collect();
        let admin_parts: Vec<&str> = admin.split('.').collect();
        let spliced = format!("{}.{}.{}", staff_parts[0], admin_parts[1], staff_parts[2]);

        assert!(matches!(keys().validate_access(&spliced, now), Err(AuthError::TokenInvalid(_))));
        assert!(keys().validate_access("not.a.token", now).is_err());
        assert!(keys().validate_access("", now).is_err());
    }

    #[test]
    fn test_wire_shape() {
        let now = Utc::now();
        let access = keys().issue_access_at(now, 11, Some("w@x.y"), Some(Role::Ssa)).unwrap();
        let refresh = keys().issue_refresh_at(now, 11).unwrap();

        assert_eq!(access.split('.').count(), 3);
        assert_eq!(refresh.split('.').count(), 3);

        let payload = peek(&access);
        assert_eq!(payload["token_type"], "access");
        assert_eq!(payload["sub"], "11");
        assert_eq!(payload["role"], "SSA");
        assert_eq!(payload["email"], "w@x.y");

        let payload = peek(&refresh);
        assert_eq!(payload["token_type"], "refresh");
        assert!(payload.get("role").is_none());
        assert!(payload.get("email").is_none());
    }

    #[test]
    fn test_issue_pair() {
        let pair = keys().issue_pair(8, "p@q.r", Role::Admin).unwrap();
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 900);

        let now = Utc::now();
        assert_eq!(keys().validate_access(&pair.access_token, now).unwrap().sub, 8);
        assert_eq!(keys().validate_refresh(&pair.refresh_token, now).unwrap().sub, 8);
    }
}
