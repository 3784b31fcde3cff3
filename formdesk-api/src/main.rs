//! # FormDesk API Server
//!
//! Serves registration, login and template provisioning over HTTP.
//!
//! Without `DATABASE_URL` the server keeps its store in memory, and without
//! `PROVIDER_BASE_URL` templates are cloned by an in-memory provider; both are
//! meant for local development.
//!
//! ## Usage
//!
//! ```bash
//! ADMIN_TOKEN=change-me-0123456789 cargo run -p formdesk-api
//! ```

use formdesk_api::app::{build_router, AppState};
use formdesk_api::config::Config;
use formdesk_core::db::migrations::{ensure_database_exists, run_migrations};
use formdesk_core::db::pool;
use formdesk_core::provider::{DocumentProvider, HttpDocumentProvider, MemoryDocumentProvider};
use formdesk_core::services::Services;
use formdesk_core::store::{MemoryRowStore, PgRowStore, RowStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formdesk_api=debug,formdesk_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "FormDesk API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let mut pg_pool = None;
    let store: Arc<dyn RowStore> = match &config.database {
        Some(database) => {
            ensure_database_exists(&database.url).await?;
            let pool = pool::create_pool(pool::DatabaseConfig {
                url: database.url.clone(),
                max_connections: database.max_connections,
                ..Default::default()
            })
            .await?;
            run_migrations(&pool).await?;
            pg_pool = Some(pool.clone());
            Arc::new(PgRowStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping the store in memory");
            Arc::new(MemoryRowStore::new())
        }
    };

    let provider: Arc<dyn DocumentProvider> = match config.provider_config() {
        Some(provider_config) => Arc::new(HttpDocumentProvider::new(provider_config)?),
        None => {
            tracing::warn!("PROVIDER_BASE_URL not set, using the in-memory document provider");
            Arc::new(MemoryDocumentProvider::new())
        }
    };

    let services = Services::new(store, provider, config.service_config());

    if config.store.auto_setup {
        let report = services.setup().await?;
        if config.store.store_id.as_deref() != Some(report.store_id.as_str()) {
            tracing::info!(
                store_id = %report.store_id,
                "Set STORE_ID to reuse this store on the next start"
            );
        }
    } else if config.store.store_id.is_none() {
        tracing::warn!("AUTO_SETUP is off and no STORE_ID is set; run POST /v1/admin/setup");
    }

    let addr = config.bind_address();
    let app = build_router(AppState::new(services, config));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pg_pool {
        pool::close_pool(pool).await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
