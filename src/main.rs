/// Main application entry point with clean architecture
mod clients;
mod config;
mod domain;
mod errors;
mod handlers;
mod routes;
mod services;
mod utils;

use crate::clients::HttpChartUpstream;
use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::routes::build_router;
use crate::services::ProxyService;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!(
        "Configuration loaded: primary={}, fallbacks={:?}, timeout={}ms",
        config.upstream.primary,
        config.upstream.fallbacks,
        config.upstream.fetch_timeout.as_millis()
    );

    // Initialize clients
    let upstream = Arc::new(HttpChartUpstream::new()?);

    // Initialize services
    let proxy_service = Arc::new(ProxyService::new(config.upstream.clone(), upstream));

    // Initialize application state
    let state = AppState { proxy_service };

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("astro_proxy listening on {}", config.bind_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("astro_proxy stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
