//! # devserve Static Server
//!
//! File: cli/src/srv/mod.rs
//!
//! ## Overview
//!
//! Serves a directory over HTTP for local development, with optional live
//! reload. The pieces, from the outside in:
//!
//! - `config`: parameter table and the resulting [`config::ServerConfig`]
//! - `server_logic`: listener lifecycle, banner, graceful shutdown
//! - `router`: axum routes (`/reload`, `/api/...`, static fallback) and
//!   request logging
//! - `static_files`: reading files, content types, per-extension transforms
//! - `paths`: URL path to filesystem path mapping that never leaves the root
//! - `reload`: SSE client registry and the injected browser snippet
//! - `watcher`: recursive, debounced change detection
//! - `utils`: banner and diagnostic helpers
//!
pub mod config;
pub mod paths;
pub mod reload;
pub mod router;
pub mod server_logic;
pub mod static_files;
pub mod utils;
pub mod watcher;

use crate::core::error::Result;
use config::ServerConfig;
use tracing::{debug, info};

/// # Handle Server Command (`handle_srv`)
///
/// Validates the serving directory and runs the server until shutdown.
///
/// ## Errors
///
/// Returns an error if the directory is missing or not a directory, if the
/// address cannot be bound, or if the server fails while running.
pub async fn handle_srv(mut config: ServerConfig) -> Result<()> {
    debug!("Server configuration: {:?}", config);
    config.resolve_directory().await?;
    info!("Serving directory {}", config.directory.display());
    server_logic::run_server(config).await
}
