//! Reconnect Server - REST API for couple agreement lifecycle and verification
//!
//! Exposes reconnect-core functionality via HTTP endpoints: agreement
//! creation, signing, status transitions, verification and PDF issuance.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use reconnect_server::store::{AgreementStore, MemoryAgreementStore, PostgresAgreementStore};
use reconnect_server::{create_router, AppState, Config};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reconnect_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env();

    let store: Arc<dyn AgreementStore> = match &config.database_url {
        Some(url) => {
            match PostgresAgreementStore::new(
                url,
                config.database_max_connections,
                config.database_min_connections,
            )
            .await
            {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::error!(error = %e, "failed to connect to PostgreSQL");
                    std::process::exit(1);
                }
            }
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (records are lost on restart)");
            Arc::new(MemoryAgreementStore::new())
        }
    };

    let fonts = match reconnect_core::FontSet::load(config.font_path.as_deref()) {
        Ok(fonts) => Some(Arc::new(fonts)),
        Err(e) => {
            tracing::warn!(error = %e, "document rendering disabled: no usable font");
            None
        }
    };

    let addr = config.socket_addr();
    let state = AppState::new(store, fonts, config);
    let app = create_router(state);

    tracing::info!("listening on http://{addr}");
    tracing::info!("API docs at http://{addr}/docs");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
