//! Process startup shared by the `edu-api` binary and `edu serve`.

use anyhow::Context;

use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::routes;
use crate::state::AppState;

/// Build state, optionally migrate, start background jobs and serve until shutdown
pub async fn serve(config: AppConfig, run_migrations: bool) -> anyhow::Result<()> {
    if config.security.jwt_secret.trim().is_empty() {
        anyhow::bail!("JWT_SECRET must be set before the API can start");
    }

    tracing::info!("Starting edu platform API in {:?} mode", config.environment);
    let port = config.api.port;
    let state = AppState::from_config(config).await.context("failed to initialise application state")?;

    if run_migrations {
        DatabaseManager::migrate(&state.pool).await.context("failed to apply migrations")?;
    }

    // Keep the scheduler alive for the lifetime of the server
    let _scheduler = state.jobs.clone().start().await.context("failed to start job scheduler")?;

    let app = routes::app(state);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Edu platform API listening on http://{}", bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// `RUST_LOG`-driven subscriber; defaults to info for this crate
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("edu_platform_api=info,tower_http=info"));
    // A second init (tests, CLI re-entry) is harmless
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
