//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use crate::auth::{ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS};
use serde::Deserialize;
use std::net::Ipv4Addr;
use thiserror::Error;
use tracing::warn;

const DEV_JWT_SECRET: &str = "staff-auth-dev-secret-change-in-production";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0),
            port: 8080,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_pool_size: usize,
    /// Connect over TLS using the system root certificates
    pub use_tls: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "postgres".to_string(),
            max_pool_size: 10,
            use_tls: false,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Token and credential settings
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub bcrypt_cost: u32,
    /// Re-read email and role from the staff directory when refreshing
    pub refresh_resolves_identity: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("refresh_resolves_identity", &self.refresh_resolves_identity)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            access_ttl_secs: ACCESS_TOKEN_TTL_SECS,
            refresh_ttl_secs: REFRESH_TOKEN_TTL_SECS,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            refresh_resolves_identity: true,
        }
    }
}

/// Admin account seeded into the in-memory directory
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    /// `None` runs against the in-memory staff directory
    pub database: Option<DatabaseConfig>,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub admin_seed: Option<AdminSeed>,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Load settings from environment variables
    ///
    /// `.env` is loaded by `main` before tracing starts.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server = ServerConfig {
            host: parse_or(&var, "HOST", ServerConfig::default().host)?,
            port: parse_or(&var, "PORT", ServerConfig::default().port)?,
        };

        // Try DATABASE_URL first, fall back to individual vars
        let database = if let Some(database_url) = var("DATABASE_URL") {
            Some(Self::parse_database_url(&database_url, &var)?)
        } else if let Some(host) = var("DB_HOST") {
            let defaults = DatabaseConfig::default();
            Some(DatabaseConfig {
                host,
                port: parse_or(&var, "DB_PORT", defaults.port)?,
                user: var("DB_USER").unwrap_or(defaults.user),
                password: var("DB_PASSWORD").unwrap_or_default(),
                database: var("DB_NAME").unwrap_or(defaults.database),
                max_pool_size: parse_or(&var, "DB_MAX_CONNECTIONS", defaults.max_pool_size)?,
                use_tls: parse_or(&var, "DB_SSL", defaults.use_tls)?,
            })
        } else {
            None
        };

        let cors = CorsConfig {
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|| CorsConfig::default().allowed_origins),
        };

        let defaults = AuthConfig::default();
        let jwt_secret = match var("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("JWT_SECRET not set, using development default (INSECURE - set in production!)");
                defaults.jwt_secret
            }
        };
        let auth = AuthConfig {
            jwt_secret,
            access_ttl_secs: parse_or(&var, "ACCESS_TOKEN_TTL_SECS", defaults.access_ttl_secs)?,
            refresh_ttl_secs: parse_or(&var, "REFRESH_TOKEN_TTL_SECS", defaults.refresh_ttl_secs)?,
            bcrypt_cost: parse_or(&var, "BCRYPT_COST", defaults.bcrypt_cost)?,
            refresh_resolves_identity: parse_or(
                &var,
                "REFRESH_RESOLVES_IDENTITY",
                defaults.refresh_resolves_identity,
            )?,
        };

        if auth.access_ttl_secs <= 0 || auth.refresh_ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue(
                "token lifetimes must be positive".to_string(),
            ));
        }
        if !(4..=31).contains(&auth.bcrypt_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "BCRYPT_COST must be between 4 and 31, got {}",
                auth.bcrypt_cost
            )));
        }

        let admin_seed = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminSeed { email, password })
            }
            _ => None,
        };

        Ok(Self {
            server,
            database,
            cors,
            auth,
            admin_seed,
        })
    }

    /// Parse a DATABASE_URL connection string (postgresql://...)
    fn parse_database_url(
        url: &str,
        var: &impl Fn(&str) -> Option<String>,
    ) -> Result<DatabaseConfig, ConfigError> {
        let parsed = url::Url::parse(url).map_err(|_| {
            ConfigError::InvalidValue(
                "Invalid DATABASE_URL format (expected postgresql://...)".to_string(),
            )
        })?;

        let host = parsed
            .host_str()
            .ok_or_else(|| ConfigError::InvalidValue("Missing host in DATABASE_URL".to_string()))?
            .to_string();

        // Hosted Postgres (e.g. Neon) refuses plaintext connections
        let sslmode_require = parsed
            .query_pairs()
            .any(|(k, v)| k == "sslmode" && (v == "require" || v == "verify-full"));
        let use_tls = sslmode_require
            || host.ends_with("neon.tech")
            || parse_or(var, "DB_SSL", false)?;

        Ok(DatabaseConfig {
            host,
            port: parsed.port().unwrap_or(5432),
            user: parsed.username().to_string(),
            password: parsed.password().map(|p| p.to_string()).unwrap_or_default(),
            database: parsed.path().trim_start_matches('/').to_string(),
            max_pool_size: parse_or(var, "DB_MAX_CONNECTIONS", 10)?,
            use_tls,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{key}={raw}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_defaults_without_environment() {
        let settings = settings(&[]).unwrap();
        assert!(settings.database.is_none());
        assert!(settings.admin_seed.is_none());
        assert_eq!(settings.auth.access_ttl_secs, 900);
        assert_eq!(settings.auth.refresh_ttl_secs, 604_800);
        assert_eq!(settings.auth.access_ttl_secs, ACCESS_TOKEN_TTL_SECS);
        assert_eq!(settings.auth.refresh_ttl_secs, REFRESH_TOKEN_TTL_SECS);
        assert!(settings.auth.refresh_resolves_identity);
        assert_eq!(settings.auth.jwt_secret, DEV_JWT_SECRET);
    }

    #[test]
    fn test_auth_overrides() {
        let settings = settings(&[
            ("JWT_SECRET", "s3cr3t"),
            ("ACCESS_TOKEN_TTL_SECS", "60"),
            ("BCRYPT_COST", "6"),
            ("REFRESH_RESOLVES_IDENTITY", "false"),
        ])
        .unwrap();
        assert_eq!(settings.auth.jwt_secret, "s3cr3t");
        assert_eq!(settings.auth.access_ttl_secs, 60);
        assert_eq!(settings.auth.bcrypt_cost, 6);
        assert!(!settings.auth.refresh_resolves_identity);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(settings(&[("PORT", "eighty")]).is_err());
        assert!(settings(&[("ACCESS_TOKEN_TTL_SECS", "0")]).is_err());
        assert!(settings(&[("BCRYPT_COST", "2")]).is_err());
        assert!(settings(&[("DATABASE_URL", "not a url")]).is_err());
    }

    #[test]
    fn test_database_url() {
        let settings = settings(&[("DATABASE_URL", "postgres://app:pw@db.internal:5433/homeland")]).unwrap();
        let db = settings.database.unwrap();
        assert_eq!(db.host, "db.internal");
        assert_eq!(db.port, 5433);
        assert_eq!(db.user, "app");
        assert_eq!(db.password, "pw");
        assert_eq!(db.database, "homeland");
        assert!(!db.use_tls);
    }

    #[test]
    fn test_database_url_sslmode() {
        let hosted = settings(&[(
            "DATABASE_URL",
            "postgresql://app:pw@ep-cool.eu-central-1.aws.example.com/staff?sslmode=require",
        )])
        .unwrap();
        let db = hosted.database.unwrap();
        assert_eq!(db.database, "staff");
        assert!(db.use_tls);

        let split = settings(&[("DB_HOST", "10.0.0.5"), ("DB_SSL", "true")]).unwrap();
        assert!(split.database.unwrap().use_tls);
    }

    #[test]
    fn test_secret_not_in_debug_output() {
        let settings = settings(&[("JWT_SECRET", "top-secret-value"), ("ADMIN_EMAIL", "a@b.c"), ("ADMIN_PASSWORD", "hunter22")]).unwrap();
        let debug = format!("{settings:?}");
        assert!(!debug.contains("top-secret-value"));
        assert!(!debug.contains("hunter22"));
    }
}
