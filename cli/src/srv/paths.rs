//! # devserve Request Path Resolution
//!
//! File: cli/src/srv/paths.rs
//!
//! ## Overview
//!
//! Turns a request path into an on-disk path that is guaranteed to sit inside
//! the serving root. The request path is percent-decoded, split on both `/`
//! and `\`, and normalized segment by segment: `.` and empty segments vanish,
//! `..` removes the previous segment, and a `..` with nothing left to remove
//! (one that would climb above the root) is dropped, as is any segment that is
//! not a single plain file name (drive prefixes such as `C:`). The remaining
//! segments are joined onto the root, so no input can name a file outside it.
//!
//! Directory targets are then re-resolved to their default document
//! (`index.html`) by [`PathResolver::locate`].
//!
use super::config::INDEX_FILE;
use percent_encoding::percent_decode_str;
use std::path::{Component, Path, PathBuf};

/// An on-disk path derived from a request. Always inside the serving root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

/// Resolves request paths against one serving root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    prefix: String,
}

impl PathResolver {
    /// `prefix` is a URL prefix every static request must carry (`""` for none).
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    /// # Resolve (`resolve`)
    ///
    /// Maps `request_path` to a path under the root without touching the disk.
    /// Returns `None` when a prefix is configured and the request lies outside it.
    pub fn resolve(&self, request_path: &str) -> Option<ResolvedPath> {
        let relative = self.strip_prefix(request_path)?;
        let decoded = percent_decode_str(relative).decode_utf8_lossy();

        let mut path = self.root.clone();
        for segment in normalize_segments(&decoded) {
            path.push(segment);
        }
        Some(ResolvedPath(path))
    }

    /// # Locate (`locate`)
    ///
    /// Like [`resolve`](Self::resolve), then swaps a directory target for its
    /// default document. Whether the final file exists is left to the reader.
    pub async fn locate(&self, request_path: &str) -> Option<ResolvedPath> {
        let resolved = self.resolve(request_path)?;
        match tokio::fs::metadata(resolved.as_path()).await {
            Ok(metadata) if metadata.is_dir() => {
                Some(ResolvedPath(resolved.0.join(INDEX_FILE)))
            }
            _ => Some(resolved),
        }
    }

    /// The root's default document.
    pub fn default_document(&self) -> ResolvedPath {
        ResolvedPath(self.root.join(INDEX_FILE))
    }

    fn strip_prefix<'a>(&self, request_path: &'a str) -> Option<&'a str> {
        if self.prefix.is_empty() {
            return Some(request_path);
        }
        let rest = request_path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

/// Normalizes a decoded path into plain segments. Leading parent segments
/// that would escape the root are discarded.
fn normalize_segments(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s if is_plain_segment(s) => segments.push(s),
            _ => {}
        }
    }
    segments
}

/// A segment that `PathBuf::push` appends as exactly one name. Colons (drive
/// prefixes, alternate data streams) and NUL bytes never qualify.
fn is_plain_segment(segment: &str) -> bool {
    if segment.contains(['\0', ':']) {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
