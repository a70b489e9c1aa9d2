//! Staff Auth API
//!
//! Authentication and authorization service for the staff portal: login
//! with email and password, short-lived access tokens, long-lived refresh
//! tokens, and role-gated routes.

mod auth;
mod config;
mod db;
mod error;
mod routes;
mod staff;
mod state;

use crate::config::Settings;
use crate::db::PgStaffDirectory;
use crate::routes::create_router;
use crate::staff::{InMemoryStaffDirectory, StaffDirectory};
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the subscriber reads RUST_LOG / LOG_FORMAT
    let _ = dotenvy::dotenv();
    init_tracing();

    info!("Starting Staff Auth API...");

    let settings = Settings::load()?;
    info!(auth = ?settings.auth, "Configuration loaded");

    let staff = build_staff_directory(&settings).await?;
    let state = Arc::new(AppState::new(staff, &settings.auth));

    let app = create_router(state, &settings);

    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("Server listening on http://{}", addr);
    info!("   POST /api/v1/login                 - Login with email/password");
    info!("   POST /api/v1/refresh               - Exchange refresh token");
    info!("   GET  /api/v1/auth                  - Current staff (Bearer)");
    info!("   POST /api/v1/admin/change-password - Admin, SSA, Director");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,staff_auth=debug,tower_http=debug"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init();
    }
}

/// Pick the staff directory: PostgreSQL when configured, otherwise in-memory
async fn build_staff_directory(settings: &Settings) -> anyhow::Result<Arc<dyn StaffDirectory>> {
    if let Some(database) = &settings.database {
        let pool = db::create_pool(database).await?;
        if settings.admin_seed.is_some() {
            warn!("ADMIN_EMAIL is ignored when a database is configured");
        }
        return Ok(Arc::new(PgStaffDirectory::new(pool)));
    }

    warn!("No database configured, using in-memory staff directory");
    let directory = InMemoryStaffDirectory::new();
    match &settings.admin_seed {
        Some(seed) => {
            directory
                .seed_admin(&seed.email, &seed.password, settings.auth.bcrypt_cost)
                .await?;
        }
        None => warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, directory is empty"),
    }
    Ok(Arc::new(directory))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
