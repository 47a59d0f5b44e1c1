//! # devserve Error Types
//!
//! File: cli/src/core/error.rs
//!
//! ## Overview
//!
//! This module defines the error types used throughout devserve. It follows a
//! two-layer approach:
//! - `DevserveError`: a `thiserror` enum naming the failure classes the server
//!   distinguishes (configuration, watcher, bind, filesystem).
//! - `Result<T>`: an alias for `anyhow::Result<T>` so call sites can attach
//!   context with `.context(...)` while still carrying a `DevserveError` that
//!   can be downcast when the class matters.
//!
//! Not every failure is an error in this sense. A missing file is answered
//! with a 404 response and a stale live-reload client is only debug-logged;
//! neither ever reaches this type.
//!
//! ## Examples
//!
//! ```rust
//! // Return a specific error type
//! if !metadata.is_dir() {
//!     anyhow::bail!(DevserveError::FileSystem(format!("Not a directory: {}", path.display())));
//! }
//!
//! // Add context using anyhow
//! let listener = TcpListener::bind(addr)
//!     .await
//!     .map_err(|source| DevserveError::Bind { addr, source })?;
//! ```
//!
use crate::core::args::ArgError;
use std::net::SocketAddr;
use thiserror::Error;

/// Custom error type for the devserve application.
#[derive(Error, Debug)]
pub enum DevserveError {
    /// A command-line argument was malformed, unknown or rejected by its validator.
    #[error("Argument error: {source}")]
    Argument {
        #[from]
        source: ArgError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Filesystem error: {0}")]
    FileSystem(String),

    /// The filesystem watcher could not be started or stopped delivering events.
    #[error("File watcher failed: {source}")]
    Watch {
        #[from]
        source: notify::Error,
    },

    #[error("Failed to bind HTTP listener to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Type alias for Result using anyhow::Error for broad compatibility.
/// Anyhow allows for easy context addition and flexible error handling.
pub type Result<T> = anyhow::Result<T>;

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_err = DevserveError::Config("Missing setting 'foo'".to_string());
        assert_eq!(
            config_err.to_string(),
            "Configuration error: Missing setting 'foo'"
        );

        let arg_err: DevserveError = ArgError::UnknownArgument("-x".into()).into();
        assert_eq!(arg_err.to_string(), "Argument error: unknown argument '-x'");

        let bind_err = DevserveError::Bind {
            addr: "127.0.0.1:8080".parse().unwrap(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(
            bind_err.to_string(),
            "Failed to bind HTTP listener to 127.0.0.1:8080: in use"
        );
    }
}
