mod app;
mod config;
mod emitter;
mod models;
mod orchestrator;
mod runner;
mod server;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use app::App;
use config::Config;
use runner::BehaveEngine;

#[tokio::main]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stepwatch=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let workspace = match std::env::args().nth(1) {
        Some(path) => std::path::absolute(&path)
            .with_context(|| format!("failed to resolve workspace {path}"))?,
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    let config = Config::load(&workspace);

    let report_dir = workspace
        .join(&config.engine.report_path)
        .parent()
        .map(|p| p.to_path_buf());
    if let Some(dir) = report_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create report directory {}", dir.display()))?;
    }

    let engine = BehaveEngine::from_config(&config.engine, workspace.clone())?;
    let app = Arc::new(App::new(workspace, &config, Arc::new(engine))?);

    let listener = TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.addr))?;
    tracing::info!(addr = %listener.local_addr()?, "listening for observers (Ctrl+C to quit)");

    server::serve(app, listener, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    })
    .await
}
