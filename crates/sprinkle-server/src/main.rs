#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use server::config::{CliArgs, ServerConfig};
use server::sweeper::spawn_sweeper;
use server::telemetry::init_telemetry;
use sprinkle::MemoryEngine;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let engine = Arc::new(MemoryEngine::in_memory(config.policy));
    let shutdown = CancellationToken::new();
    let sweeper = spawn_sweeper(
        Arc::clone(&engine),
        config.sweep_interval,
        shutdown.clone(),
    );

    shutdown_signal().await;
    shutdown.cancel();
    sweeper.await?;

    tracing::info!(
        live = engine.live_count(),
        archived = engine.archived_count(),
        "Service shut down successfully"
    );
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting allocation engine with full config: {:#?}", config);
    } else {
        tracing::info!(
            claim_window = %config.policy.claim_window,
            visibility_window = %config.policy.visibility_window,
            sweep_interval = ?config.sweep_interval,
            "Starting allocation engine"
        );
    }
    if config.policy.has_inverted_windows() {
        tracing::warn!(
            "CLAIM_WINDOW ({}) is longer than VISIBILITY_WINDOW ({}); claims stop at the visibility deadline",
            config.policy.claim_window,
            config.policy.visibility_window
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
}
