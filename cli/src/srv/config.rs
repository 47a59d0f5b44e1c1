//! # devserve Server Configuration
//!
//! File: cli/src/srv/config.rs
//!
//! ## Overview
//!
//! This module declares the server's command-line parameters and turns the
//! parsed values into the immutable [`ServerConfig`] used for the lifetime of
//! the process. All configuration comes from the command line; no files or
//! environment variables are consulted.
//!
//! ## Architecture
//!
//! 1. [`parameter_definitions`] returns the single ordered parameter table,
//!    shared by the parser and the help text.
//! 2. `core::args` parses the raw arguments against that table.
//! 3. [`ServerConfig::from_parsed`] converts the parsed values into typed fields.
//! 4. [`ServerConfig::resolve_directory`] canonicalizes the serving root and
//!    verifies it is an existing directory.
//!
//! ## Command Line
//!
//! ```bash
//! devserve                     # serve . on 127.0.0.1:8080
//! devserve -p 3000 www -watch  # serve ./www on port 3000 with live reload
//! devserve -spa -v dist        # SPA fallback, debug logging
//! ```
//!
use crate::core::args::{ParameterDefinition, ParsedArgs, Value, ValueKind};
use crate::core::error::{DevserveError, Result};
use anyhow::Context;
use std::net::IpAddr;
use std::{env, path::PathBuf};
use tracing::debug;

/// Name shown in usage text.
pub const PROGRAM_NAME: &str = "devserve";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_DIRECTORY: &str = ".";

/// Default document served for directory requests.
pub const INDEX_FILE: &str = "index.html";

fn is_port(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.fract() == 0.0 && (1.0..=65535.0).contains(n))
}

fn is_ip_address(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.parse::<IpAddr>().is_ok())
}

fn is_url_prefix(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty() || s.starts_with('/'))
}

/// # Parameter Table (`parameter_definitions`)
///
/// The ordered list of every argument `devserve` accepts. Declaration order is
/// the order shown in the help text.
pub fn parameter_definitions() -> Vec<ParameterDefinition> {
    vec![
        ParameterDefinition::flag("port", &["p", "port"], ValueKind::Number)
            .with_default(Value::Number(f64::from(DEFAULT_PORT)))
            .with_validator(is_port, "must be an integer between 1 and 65535")
            .describe("Port to listen on"),
        ParameterDefinition::flag("verbose", &["v", "verbose"], ValueKind::Boolean)
            .with_default(Value::Boolean(false))
            .describe("Enable debug logging"),
        ParameterDefinition::flag("watch", &["w", "watch"], ValueKind::Boolean)
            .with_default(Value::Boolean(false))
            .describe("Watch the directory and live-reload browsers on change"),
        ParameterDefinition::positional("dirpath", 0, ValueKind::String)
            .with_default(Value::String(DEFAULT_DIRECTORY.to_string()))
            .describe("Directory to serve"),
        ParameterDefinition::flag("host", &["host"], ValueKind::String)
            .with_default(Value::String(DEFAULT_HOST.to_string()))
            .with_validator(is_ip_address, "must be an IP address")
            .describe("Address to bind"),
        ParameterDefinition::flag("spa", &["s", "spa"], ValueKind::Boolean)
            .with_default(Value::Boolean(false))
            .describe("Serve index.html for unmatched paths (single-page apps)"),
        ParameterDefinition::flag("prefix", &["prefix"], ValueKind::String)
            .with_default(Value::String(String::new()))
            .with_validator(is_url_prefix, "must be empty or start with '/'")
            .describe("Only serve static files under this URL prefix"),
        ParameterDefinition::flag("help", &["h", "help"], ValueKind::Boolean)
            .describe("Print this help text and exit"),
    ]
}

/// # Effective Server Configuration (`ServerConfig`)
///
/// Immutable settings read by every server component.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// The network port the server will listen on.
    pub port: u16,

    /// The network IP address the server will bind to.
    pub host: IpAddr,

    /// The serving root. Absolute and canonical after `resolve_directory`.
    pub directory: PathBuf,

    /// Debug-level logging.
    pub verbose: bool,

    /// Live reload: watch `directory` and inject the reload client into HTML.
    pub watch: bool,

    /// Serve the root default document for paths that do not exist.
    pub spa: bool,

    /// Required URL prefix for static files; empty means none.
    pub prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            verbose: false,
            watch: false,
            spa: false,
            prefix: String::new(),
        }
    }
}

impl ServerConfig {
    /// # Create Configuration from Parsed Arguments (`from_parsed`)
    ///
    /// Reads each typed field out of `parsed`, falling back to the defaults for
    /// anything absent.
    ///
    /// ## Errors
    ///
    /// Returns `DevserveError::Config` if a value that passed validation still
    /// cannot be represented (only reachable with a hand-built `ParsedArgs`).
    pub fn from_parsed(parsed: &ParsedArgs) -> Result<Self> {
        let defaults = Self::default();

        let port = match parsed.number("port") {
            Some(n) if is_port(&Value::Number(n)) => n as u16,
            Some(n) => anyhow::bail!(DevserveError::Config(format!("invalid port {}", n))),
            None => defaults.port,
        };

        let host = match parsed.string("host") {
            Some(s) => s
                .parse()
                .map_err(|e| DevserveError::Config(format!("invalid host '{}': {}", s, e)))?,
            None => defaults.host,
        };

        Ok(Self {
            port,
            host,
            directory: parsed
                .string("dirpath")
                .map(PathBuf::from)
                .unwrap_or(defaults.directory),
            verbose: parsed.flag("verbose"),
            watch: parsed.flag("watch"),
            spa: parsed.flag("spa"),
            prefix: parsed
                .string("prefix")
                .map(|p| p.trim_end_matches('/').to_string())
                .unwrap_or(defaults.prefix),
        })
    }

    /// # Resolve and Validate Directory Path (`resolve_directory`)
    ///
    /// Makes `directory` absolute (relative to the working directory),
    /// canonicalizes it and checks that it is a directory.
    ///
    /// ## Errors
    ///
    /// Returns an error if the working directory is unavailable, the path cannot
    /// be canonicalized, or it is not a directory.
    pub async fn resolve_directory(&mut self) -> Result<()> {
        let absolute_path = if self.directory.is_absolute() {
            self.directory.clone()
        } else {
            env::current_dir()
                .context("Failed to get current working directory")?
                .join(&self.directory)
        };

        let canonical_path = tokio::fs::canonicalize(&absolute_path)
            .await
            .with_context(|| {
                format!(
                    "Directory '{}' could not be found or accessed",
                    absolute_path.display()
                )
            })?;

        let metadata = tokio::fs::metadata(&canonical_path)
            .await
            .with_context(|| {
                format!("Failed to get metadata for '{}'", canonical_path.display())
            })?;
        if !metadata.is_dir() {
            anyhow::bail!(DevserveError::FileSystem(format!(
                "Path is not a directory: {}",
                canonical_path.display()
            )));
        }

        self.directory = canonical_path;
        debug!("Resolved serving directory to: {}", self.directory.display());
        Ok(())
    }
}
