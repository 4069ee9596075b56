//! workspace-sync: mirror a directory of markdown documents into a local
//! object service.
//!
//! Existing documents are swept once at startup, then every change the
//! watcher reports is pushed as a create, update or delete.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::sync::Arc;
use sync_core::{
    Dispatcher, IdStore, RefreshController, Session, SyncEngine, initial_sync, read_session_token,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sync_daemon::{Args, Config, DirectoryWatcher, HttpTransport, ProcessRestart};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from(Args::parse());

    // Set up logging - respects RUST_LOG env var, defaults to info (or debug with --verbose)
    let default_filter = if config.verbose {
        "debug,workspace_sync=debug"
    } else {
        "info,workspace_sync=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting workspace-sync");
    info!("Watch directory: {}", config.watch_dir.display());
    info!("Space: {}", config.space_id);
    info!("API: {}", config.api_url);

    if !config.watch_dir.is_dir() {
        bail!("Watch directory {} does not exist", config.watch_dir.display());
    }

    let store = IdStore::open(&config.object_map)
        .with_context(|| format!("Failed to load object map {}", config.object_map.display()))?;
    info!("Loaded {} mapping(s) from {}", store.len(), store.path().display());

    let session = connect(&config).await?;
    if session.is_connected() {
        if let Err(e) = session.health_check().await {
            warn!("Health check failed: {}", e);
        }
        match session.open_container(&config.space_id).await {
            Ok(()) => info!("Opened space {}", config.space_id),
            Err(e) => warn!("Failed to open space {}: {}", config.space_id, e),
        }
    }

    let engine = Arc::new(SyncEngine::new(
        Arc::new(session),
        Arc::new(store),
        config.space_id.clone(),
    ));

    // Start watching before the sweep so edits made during it are not lost.
    let (watcher, events) = DirectoryWatcher::start(&config.watch_dir)
        .with_context(|| format!("Failed to watch {}", config.watch_dir.display()))?;

    let report = initial_sync(watcher.root(), &engine, &config.sync).await?;
    if report.failed > 0 {
        warn!("{} document(s) will sync on their next change", report.failed);
    }

    let dispatcher = Dispatcher::new(engine, config.sync.clone());

    info!("Daemon running. Press Ctrl+C to stop.");

    tokio::select! {
        _ = dispatcher.run(events) => {
            error!("Event stream ended unexpectedly");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        }
    }

    drop(watcher);
    Ok(())
}

/// Build the remote session.
///
/// An unreachable service is not fatal: the daemon keeps running and every
/// sync attempt fails with a not-connected error until restarted.
async fn connect(config: &Config) -> Result<Session> {
    let token = match read_session_token(&config.credential_file) {
        Ok(token) => token,
        Err(e) => {
            warn!("No session token available: {}", e);
            String::new()
        }
    };

    let transport = HttpTransport::new(&config.api_url)
        .with_context(|| format!("Invalid API URL {}", config.api_url))?;

    if let Err(e) = transport.probe().await {
        warn!(
            "Service at {} is unreachable ({}), running without a connection",
            transport.base_url(),
            e
        );
        return Ok(Session::disconnected());
    }

    let reauth = ProcessRestart::new(&config.service_binary, &config.credential_file);
    let refresh = RefreshController::new(token, Arc::new(reauth), config.refresh);
    info!("Connected to {}", transport.base_url());

    Ok(Session::connected(Arc::new(transport), refresh))
}
