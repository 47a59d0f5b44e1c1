//! # devserve Static File Serving
//!
//! File: cli/src/srv/static_files.rs
//!
//! ## Overview
//!
//! Reads files resolved by [`PathResolver`] and turns them into HTTP responses:
//! - The content type comes from the file extension (`mime_guess`), with
//!   `text/plain` for anything unrecognized.
//! - A [`TransformTable`] can rewrite the bytes of selected extensions before
//!   they are sent. Watch mode uses this to inject the live-reload client into
//!   HTML pages.
//! - Any read failure becomes a `404 Not Found` with a short message. In SPA
//!   mode a missing file is answered with the root's `index.html` instead.
//!
use super::paths::{PathResolver, ResolvedPath};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Fallback for extensions the MIME table does not know.
const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// A byte-level rewrite applied to files of one extension.
pub type Transform = Arc<dyn Fn(Vec<u8>) -> Vec<u8> + Send + Sync>;

/// Per-extension content transforms. Extensions are matched without the dot,
/// ignoring ASCII case.
#[derive(Clone, Default)]
pub struct TransformTable {
    by_extension: HashMap<String, Transform>,
}

impl TransformTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, extension: &str, transform: F)
    where
        F: Fn(Vec<u8>) -> Vec<u8> + Send + Sync + 'static,
    {
        self.by_extension
            .insert(extension.to_ascii_lowercase(), Arc::new(transform));
    }

    fn for_path(&self, path: &Path) -> Option<&Transform> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        self.by_extension.get(&extension)
    }
}

impl fmt::Debug for TransformTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.by_extension.keys()).finish()
    }
}

/// # Content Type (`content_type`)
///
/// MIME type for `path` by extension. Text types are marked UTF-8.
pub fn content_type(path: &Path) -> String {
    let mime = mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(DEFAULT_CONTENT_TYPE);
    if mime.starts_with("text/") || mime == "application/javascript" {
        format!("{}; charset=utf-8", mime)
    } else {
        mime.to_string()
    }
}

/// Serves files from one root directory.
#[derive(Debug, Clone)]
pub struct StaticFileServer {
    resolver: PathResolver,
    transforms: TransformTable,
    spa: bool,
}

impl StaticFileServer {
    pub fn new(resolver: PathResolver, transforms: TransformTable, spa: bool) -> Self {
        Self {
            resolver,
            transforms,
            spa,
        }
    }

    /// # Serve (`serve`)
    ///
    /// Answers `request_path` with the file it resolves to, or a 404.
    pub async fn serve(&self, request_path: &str) -> Response {
        let Some(resolved) = self.resolver.locate(request_path).await else {
            debug!("'{}' is outside the configured prefix", request_path);
            return not_found(request_path);
        };

        match tokio::fs::read(resolved.as_path()).await {
            Ok(bytes) => self.respond(&resolved, bytes),
            Err(e) if self.spa => {
                debug!(
                    "Falling back to default document for '{}' ({})",
                    request_path, e
                );
                let fallback = self.resolver.default_document();
                match tokio::fs::read(fallback.as_path()).await {
                    Ok(bytes) => self.respond(&fallback, bytes),
                    Err(e) => {
                        info!("Default document unavailable: {}", e);
                        not_found(request_path)
                    }
                }
            }
            Err(e) => {
                info!(
                    "Cannot read '{}': {}",
                    resolved.as_path().display(),
                    e
                );
                not_found(request_path)
            }
        }
    }

    fn respond(&self, path: &ResolvedPath, bytes: Vec<u8>) -> Response {
        let body = match self.transforms.for_path(path.as_path()) {
            Some(transform) => transform(bytes),
            None => bytes,
        };
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type(path.as_path())),
                (header::CACHE_CONTROL, "no-cache".to_string()),
            ],
            body,
        )
            .into_response()
    }
}

/// Plain-text 404 naming the requested path.
pub fn not_found(request_path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("Not found: {}", request_path),
    )
        .into_response()
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use tempfile::TempDir;

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn fixture() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::write(root.join("index.html"), "<html><body>home</body></html>").unwrap();
        std::fs::create_dir(root.join("docs")).unwrap();
        std::fs::write(root.join("docs").join("index.html"), "<p>docs</p>").unwrap();
        std::fs::write(root.join("style.css"), "body{}").unwrap();
        std::fs::write(root.join("notes.unknownext"), "raw").unwrap();
        std::fs::create_dir(root.join("empty")).unwrap();
        temp_dir
    }

    fn server(root: &Path, transforms: TransformTable, spa: bool) -> StaticFileServer {
        StaticFileServer::new(PathResolver::new(root, ""), transforms, spa)
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("a.html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("a.css")), "text/css; charset=utf-8");
        assert_eq!(content_type(Path::new("a.png")), "image/png");
        assert_eq!(content_type(Path::new("a.zzzz")), "text/plain; charset=utf-8");
        assert_eq!(content_type(Path::new("Makefile")), "text/plain; charset=utf-8");
    }

    #[tokio::test]
    async fn test_directory_serves_index_as_html() {
        let dir = fixture();
        let response = server(dir.path(), TransformTable::new(), false)
            .serve("/docs/")
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let ct = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(ct.starts_with("text/html"));
        assert_eq!(body_string(response).await, "<p>docs</p>");
    }

    #[tokio::test]
    async fn test_missing_file_and_empty_dir_are_not_found() {
        let dir = fixture();
        let s = server(dir.path(), TransformTable::new(), false);

        let response = s.serve("/nope.js").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.contains("/nope.js"));

        let response = s.serve("/empty/").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_extension_is_plain_text() {
        let dir = fixture();
        let response = server(dir.path(), TransformTable::new(), false)
            .serve("/notes.unknownext")
            .await;
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_transform_applies_only_to_registered_extension() {
        let dir = fixture();
        let mut transforms = TransformTable::new();
        transforms.register("HTML", |mut bytes| {
            bytes.extend_from_slice(b"<!-- injected -->");
            bytes
        });
        let s = server(dir.path(), transforms, false);

        let html = body_string(s.serve("/").await).await;
        assert!(html.ends_with("<!-- injected -->"));

        let css = body_string(s.serve("/style.css").await).await;
        assert_eq!(css, "body{}");
    }

    #[tokio::test]
    async fn test_spa_falls_back_to_root_index() {
        let dir = fixture();
        let response = server(dir.path(), TransformTable::new(), true)
            .serve("/some/client/route")
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("home"));

        std::fs::remove_file(dir.path().join("index.html")).unwrap();
        let response = server(dir.path(), TransformTable::new(), true)
            .serve("/some/client/route")
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
