//! Application builder: wires the router and middleware into an Axum app.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use apilog_core::config::AppConfig;
use apilog_core::error::AppError;

use crate::ip_lookup::HttpIpInfoProvider;
use crate::middleware::logger::ApiLoggerLayer;
use crate::router::build_router;

/// Builds the request logger described by `config`.
///
/// An HTTP IP-info lookup is attached when `ip_lookup.enabled` is set.
pub fn build_logger_layer(config: &AppConfig) -> Result<ApiLoggerLayer, AppError> {
    let layer = ApiLoggerLayer::new(config.logger.clone());
    if !config.ip_lookup.enabled {
        return Ok(layer);
    }

    let provider = HttpIpInfoProvider::new(&config.ip_lookup)?;
    tracing::info!(url = %config.ip_lookup.external_api_url, "IP info lookup enabled");
    Ok(layer.with_ip_info(provider))
}

/// Builds the demo application with the request logger and tracing layers.
pub fn build_app(logger: ApiLoggerLayer) -> Router {
    build_router()
        .layer(logger)
        .layer(TraceLayer::new_for_http())
}

/// Runs the demo server until Ctrl+C.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    let app = build_app(build_logger_layer(&config)?);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("apilog demo server listening on {}", addr);

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    // In-flight requests get `grace` to finish once the signal arrives.
    let deadline = async move {
        if stop_rx.wait_for(|stopped| *stopped).await.is_ok() {
            tokio::time::sleep(grace).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server.into_future() => {
            result.map_err(|e| AppError::internal(format!("Server error: {}", e)))?;
        }
        _ = deadline => {
            tracing::warn!(grace_seconds = grace.as_secs(), "Graceful shutdown timed out");
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
