// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `droverd`: the task-orchestrator daemon.
//!
//! Resolves the state directory, takes the daemon lock, runs the
//! orchestrator until SIGINT/SIGTERM, then shuts down cleanly.

use drover_daemon::{Config, Daemon, DaemonError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, DaemonError>
{
    std::fs::create_dir_all(&config.log_dir)?;
    let appender = tracing_appender::rolling::daily(&config.log_dir, "droverd.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

async fn run() -> Result<(), DaemonError> {
    let config = Config::load()?;
    let _log_guard = init_logging(&config)?;

    let daemon = Daemon::start(config)?;

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
    }

    daemon.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Logging may not be up yet; print as well.
        error!(error = %e, "daemon failed");
        eprintln!("droverd: {e}");
        std::process::exit(1);
    }
}
