//! # devserve HTTP Server Implementation
//!
//! File: cli/src/srv/server_logic.rs
//!
//! ## Overview
//!
//! Owns the listener lifecycle:
//! 1. Bind the configured address. Failure here is the one fatal error.
//! 2. Start the change watcher when watch mode is on. If it cannot start the
//!    server keeps going without live reload.
//! 3. Build the router and print the startup banner.
//! 4. Serve until Ctrl+C / SIGTERM, then close every live-reload stream so
//!    graceful shutdown is not held up by connections that never end.
//!
use super::config::ServerConfig;
use super::reload::ReloadChannel;
use super::router::{create_app, AppState};
use super::utils;
use super::watcher::{ChangeWatcher, WatchHandle, DEFAULT_DEBOUNCE};
use crate::core::error::{DevserveError, Result};
use anyhow::Context;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// # Run HTTP Server (`run_server`)
///
/// Binds `config.host:config.port` and serves until a shutdown signal.
///
/// ## Errors
///
/// Returns `DevserveError::Bind` if the address cannot be bound, or an error
/// if the server itself fails.
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let addr = SocketAddr::new(config.host, config.port);
    let listener = bind_listener(addr).await?;
    serve(listener, config, shutdown_signal()).await
}

async fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| DevserveError::Bind { addr, source })?;
    Ok(listener)
}

/// # Serve (`serve`)
///
/// Runs the application on an already bound `listener` until `shutdown`
/// completes.
pub async fn serve<F>(listener: TcpListener, config: ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .context("Failed to read the listener's local address")?;

    utils::log_root_summary(&config.directory);

    let reload = ReloadChannel::new();
    let _watch = if config.watch {
        start_watcher(&config, reload.clone())
    } else {
        None
    };

    let app = create_app(AppState::from_config(&config, reload.clone()));

    print_banner(&config, addr);
    info!(
        "Starting server on {} for directory {}",
        addr,
        config.directory.display()
    );

    let streams = reload.clone();
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown.await;
            streams.close_all();
        })
        .await
        .context("HTTP server failed")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Starts watching the serving root, broadcasting a reload on every
/// debounced change. Logs and returns `None` if the watch cannot start.
fn start_watcher(config: &ServerConfig, reload: ReloadChannel) -> Option<WatchHandle> {
    let watcher = ChangeWatcher::new(&config.directory, DEFAULT_DEBOUNCE);
    let result = watcher.spawn(move || {
        let delivered = reload.broadcast();
        info!("Files changed, reloading {} client(s)", delivered);
    });
    match result {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("{:#}. Continuing without live reload.", e);
            None
        }
    }
}

fn print_banner(config: &ServerConfig, addr: SocketAddr) {
    let urls = utils::server_urls(addr, utils::get_local_ip());

    println!("\n=================================================================");
    println!("📂 Serving files from: {}", config.directory.display());
    for (i, url) in urls.iter().enumerate() {
        let label = if i == 0 { "Local URL:  " } else { "Network URL:" };
        println!("🌐 {}        {}", label, url);
    }
    if !config.prefix.is_empty() {
        println!("📎 URL prefix:         {}", config.prefix);
    }
    println!(
        "🔄 Live reload:        {}",
        if config.watch { "on" } else { "off" }
    );
    println!(
        "🧭 SPA fallback:       {}",
        if config.spa { "on" } else { "off" }
    );
    println!("=================================================================\n");
    println!("Server starting! Press Ctrl+C to stop.");
}

/// # Handle Shutdown Signal (`shutdown_signal`)
///
/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
            Err(e) => {
                error!(
                    "Failed to install SIGTERM handler: {}. Shutdown on SIGTERM might not work.",
                    e
                );
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
}
