//! Database access for the staff directory
//!
//! Reads the existing `staff` table. Table creation and seeding belong to
//! the deployment, not this service.

use crate::auth::Role;
use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::staff::{StaffDirectory, StaffRecord};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::{NoTls, Row};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, info, warn};

const STAFF_COLUMNS: &str = "id, first_name, middle_name, last_name, email, password, agent_id, \
     profile_photo, position, department, role, must_change_password";

/// Create a connection pool and verify it with a test query
pub async fn create_pool(config: &DatabaseConfig) -> Result<Pool, AppError> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.database.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(config.max_pool_size));

    let pool = if config.use_tls {
        cfg.create_pool(Some(Runtime::Tokio1), tls_connector())
            .map_err(|e| AppError::Internal(format!("Failed to create TLS pool: {}", e)))?
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| AppError::Internal(format!("Failed to create pool: {}", e)))?
    };

    let client = pool.get().await?;
    client.query_one("SELECT 1", &[]).await?;
    drop(client);

    info!(
        host = %config.host,
        database = %config.database,
        tls = config.use_tls,
        "Database pool established"
    );
    Ok(pool)
}

/// TLS connector trusting the platform's native root certificates
fn tls_connector() -> MakeRustlsConnect {
    let certs = rustls_native_certs::load_native_certs();
    for err in &certs.errors {
        warn!(error = %err, "Skipping unreadable native certificate");
    }

    let mut root_store = rustls::RootCertStore::empty();
    let (added, ignored) = root_store.add_parsable_certificates(certs.certs);
    debug!(added, ignored, "Loaded native root certificates");

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    MakeRustlsConnect::new(tls_config)
}

/// Staff directory backed by PostgreSQL
pub struct PgStaffDirectory {
    pool: Pool,
}

impl PgStaffDirectory {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn staff_from_row(row: &Row) -> Result<StaffRecord, AppError> {
    let role: String = row.try_get("role")?;
    let role = role
        .parse::<Role>()
        .map_err(|e| AppError::Internal(format!("Corrupt staff row: {}", e)))?;

    Ok(StaffRecord {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        middle_name: row.try_get::<_, Option<String>>("middle_name")?.unwrap_or_default(),
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password")?,
        agent_id: row.try_get("agent_id")?,
        profile_photo: row.try_get::<_, Option<String>>("profile_photo")?.unwrap_or_default(),
        position: row.try_get("position")?,
        department: row.try_get("department")?,
        role,
        must_change_password: row.try_get("must_change_password")?,
    })
}

#[async_trait]
impl StaffDirectory for PgStaffDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<StaffRecord>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                format!("SELECT {STAFF_COLUMNS} FROM staff WHERE email = $1").as_str(),
                &[&email],
            )
            .await?;

        row.as_ref().map(staff_from_row).transpose()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<StaffRecord>, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                format!("SELECT {STAFF_COLUMNS} FROM staff WHERE id = $1").as_str(),
                &[&id],
            )
            .await?;

        row.as_ref().map(staff_from_row).transpose()
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                "UPDATE staff SET password = $1, updated_at = NOW() WHERE id = $2",
                &[&password_hash, &id],
            )
            .await?;

        if updated == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        debug!(staff_id = id, "Password updated");
        Ok(())
    }
}
