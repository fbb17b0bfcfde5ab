//! # erc7231-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the identity registry.
//! Binds to configurable port (default 8080).

use anyhow::Context;
use erc7231_api::state::{AppConfig, LogFormat};
use erc7231_api::AppState;
use metrics_exporter_prometheus::PrometheusBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("reading configuration")?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let prometheus = if config.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("installing Prometheus recorder")?;
        Some(handle)
    } else {
        tracing::info!("metrics disabled");
        None
    };

    if config.auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set; /v1/* is unauthenticated");
    }
    tracing::info!(
        encoding = %config.registry.encoding,
        algorithm = %config.registry.algorithm,
        "registry configured"
    );

    let port = config.port;
    let state = AppState::with_config(config, prometheus);
    let app = erc7231_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("ERC-7231 API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
