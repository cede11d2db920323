//! Question service HTTP entry point

use anyhow::Context;
use clap::Parser;
use question_service::{api::create_router, config::Config, logging, state::AppState};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "question-server", version, about = "Q&A question and tag service")]
struct Args {
    /// Path to a TOML config file (defaults to $QA_CONFIG or ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match args.config.as_deref() {
        Some(path) => Config::load_from(Some(path)),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let _telemetry_guard =
        logging::init_logging(&config.logging).context("Failed to initialize logging/telemetry")?;

    let addr = config
        .socket_addr()
        .context("Failed to determine socket address")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.logging.deployment_environment,
        backend = ?config.database.backend,
        auth_enabled = config.auth.enabled,
        "Starting question service"
    );

    let state = AppState::new(config)
        .await
        .context("Failed to initialize application state")?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener on {addr}"))?;
    tracing::info!(listen_addr = %addr, "Question service listening");

    // Telemetry is flushed when `_telemetry_guard` drops on return.
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server terminated unexpectedly");
        return Err(e.into());
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "Could not install SIGTERM handler, waiting for Ctrl+C only");
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = wait_for_ctrl_c() => {}
        _ = sigterm.recv() => {
            tracing::info!("SIGTERM received, starting graceful shutdown");
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("SIGINT received, starting graceful shutdown"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
