//! # devserve Server Utilities
//!
//! File: cli/src/srv/utils.rs
//!
//! ## Overview
//!
//! Helpers for the startup banner and diagnostics that are not part of the
//! request path:
//! - Summarizing the serving root once at startup
//! - Detecting a LAN address so the banner can show a network URL
//!
use super::config::INDEX_FILE;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::path::Path;
use tracing::{debug, warn};

/// Top-level shape of the serving root, gathered once before serving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSummary {
    pub files: usize,
    pub directories: usize,
    pub has_index: bool,
}

/// # Summarize Serving Root (`summarize_root`)
///
/// Counts the entries directly under `root`. `None` if it cannot be listed.
pub fn summarize_root(root: &Path) -> Option<RootSummary> {
    let mut summary = RootSummary::default();
    for entry in std::fs::read_dir(root).ok()?.flatten() {
        match entry.file_type() {
            Ok(kind) if kind.is_dir() => summary.directories += 1,
            Ok(_) => {
                summary.files += 1;
                summary.has_index |= entry.file_name() == INDEX_FILE;
            }
            Err(_) => {}
        }
    }
    Some(summary)
}

/// Logs [`summarize_root`] at debug level and warns when `/` has nothing to serve.
pub fn log_root_summary(root: &Path) {
    match summarize_root(root) {
        Some(summary) => {
            debug!(
                files = summary.files,
                directories = summary.directories,
                "Serving root {}",
                root.display()
            );
            if !summary.has_index {
                warn!(
                    "No {} in {}; requests for / will return 404",
                    INDEX_FILE,
                    root.display()
                );
            }
        }
        None => warn!("Could not list serving root {}", root.display()),
    }
}

/// # Get Local IP Address (`get_local_ip`)
///
/// Finds the address of the interface that would route to the internet by
/// "connecting" a UDP socket (no packets are sent). `None` when offline.
pub fn get_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("192.0.2.1:80").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    if ip.is_unspecified() || ip.is_loopback() {
        None
    } else {
        Some(ip)
    }
}

/// # Server URLs (`server_urls`)
///
/// URLs to print for a listener bound to `addr`: always a localhost URL, plus
/// a network URL when bound to all interfaces or to a non-loopback address.
pub fn server_urls(addr: SocketAddr, local_ip: Option<IpAddr>) -> Vec<String> {
    let mut urls = vec![format!("http://localhost:{}", addr.port())];
    let network_ip = if addr.ip().is_unspecified() {
        local_ip
    } else if !addr.ip().is_loopback() {
        Some(addr.ip())
    } else {
        None
    };
    if let Some(ip) = network_ip {
        urls.push(format!("http://{}", SocketAddr::new(ip, addr.port())));
    }
    urls
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_summarize_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("app.js"), "console.log(1)").unwrap();
        fs::create_dir(root.join("assets")).unwrap();
        fs::write(root.join("assets").join("logo.svg"), "<svg/>").unwrap();

        let summary = summarize_root(root).unwrap();
        assert_eq!(
            summary,
            RootSummary {
                files: 1,
                directories: 1,
                has_index: false
            }
        );

        fs::write(root.join(INDEX_FILE), "<h1>home</h1>").unwrap();
        assert!(summarize_root(root).unwrap().has_index);

        assert_eq!(summarize_root(&root.join("missing")), None);
        log_root_summary(&root.join("missing"));
    }

    #[test]
    fn test_server_urls() {
        let lan: IpAddr = "192.168.1.20".parse().unwrap();

        let loopback: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        assert_eq!(
            server_urls(loopback, Some(lan)),
            vec!["http://localhost:8080".to_string()]
        );

        let any: SocketAddr = "0.0.0.0:3000".parse().unwrap();
        assert_eq!(
            server_urls(any, Some(lan)),
            vec![
                "http://localhost:3000".to_string(),
                "http://192.168.1.20:3000".to_string()
            ]
        );
        assert_eq!(server_urls(any, None).len(), 1);
    }

    #[test]
    fn test_get_local_ip_is_never_loopback() {
        if let Some(ip) = get_local_ip() {
            assert!(!ip.is_loopback());
        }
    }
}
