//! # sigil-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to `PORT` (default 8080).

use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use sigil_api::state::{AppConfig, AppState};
use sigil_zkp::SigilProver;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("reading configuration")?;
    tracing::info!(?config, "configuration loaded");

    let prover = match &config.zk_key_dir {
        Some(dir) => {
            let prover = SigilProver::from_dir(dir, config.hash_version)
                .context("loading proving keys")?;
            prover
                .self_check()
                .context("loaded keys failed the self check")?;
            tracing::info!("proving keys loaded from key directory");
            prover
        }
        None => {
            tracing::warn!(
                version = %config.hash_version,
                "no key directory configured, using the seeded setup"
            );
            SigilProver::deterministic(config.hash_version).context("building seeded setup")?
        }
    };
    let fingerprint = prover.keys().fingerprint().context("fingerprinting key")?;
    tracing::info!(%fingerprint, version = %prover.version(), "prover ready");

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("installing metrics recorder")?;

    let port = config.port;
    let state = AppState::with_config(config, Arc::new(prover)).with_metrics(handle);
    let app = sigil_api::app(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("Sigil API listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
