mod api;
mod config;
mod engine;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::{
    config::AppConfig,
    engine::{Engine, metrics::MetricsRegistry},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    init_tracing(&config);

    tokio::fs::create_dir_all(&config.workspace_root)
        .await
        .with_context(|| {
            format!(
                "failed to create workspace root {}",
                config.workspace_root.display()
            )
        })?;

    let templates = api::load_templates().context("failed to load templates")?;
    let metrics = Arc::new(MetricsRegistry::new());
    let engine = Arc::new(Engine::new(&config, metrics.clone()));
    let app = api::routes(engine, metrics, templates);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .context("failed to bind listener")?;

    tracing::info!(
        addr = %config.bind_addr,
        workspace_root = %config.workspace_root.display(),
        "gobox listening"
    );

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
