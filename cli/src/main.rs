//! # devserve Main Entry Point
//!
//! File: cli/src/main.rs
//!
//! ## Overview
//!
//! Entry point of the `devserve` binary, a static file server for local
//! development with optional live reload. It:
//! - Parses the command line against the server's parameter table
//! - Sets up logging (info by default, debug with `-v`)
//! - Hands the resulting configuration to the server
//!
//! ## Examples
//!
//! ```bash
//! devserve -help
//! devserve -p 3000 www -watch
//! ```
//!
//! Processing flow:
//! 1. Parse arguments; help or a bad argument prints usage and exits
//! 2. Configure logging from the verbose flag
//! 3. Run the server until Ctrl+C
//! 4. Print any fatal error and exit with status 1
//!
use tracing_subscriber::{fmt, EnvFilter};

mod core; // Argument parsing, help text, errors
mod srv; // The HTTP server itself

use srv::config::{parameter_definitions, ServerConfig, PROGRAM_NAME};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let parsed = core::args::parse_or_exit(PROGRAM_NAME, &parameter_definitions(), &args);

    let config = match ServerConfig::from_parsed(&parsed) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let log_level = if config.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::new(format!("warn,{}={}", env!("CARGO_CRATE_NAME"), log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed arguments: {:?}", parsed);

    if let Err(e) = srv::handle_srv(config).await {
        tracing::error!("Server failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
