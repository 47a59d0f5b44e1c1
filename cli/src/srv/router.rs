//! # devserve Request Router
//!
//! File: cli/src/srv/router.rs
//!
//! ## Overview
//!
//! Builds the Axum `Router` and dispatches every request to exactly one
//! handler, in this order:
//! 1. `GET /reload`: registers a live-reload client and keeps an event stream open.
//! 2. `/api` and `/api/...`: a reserved namespace. It checks the version
//!    segment and answers `404` for everything (no endpoints exist yet).
//! 3. Any other path: served as a static file (`GET`/`HEAD` only).
//!
//! Every request passes through [`log_request`], which logs method, path,
//! status and elapsed time classified by status range, and through a
//! permissive CORS layer.
//!
use super::config::ServerConfig;
use super::paths::PathResolver;
use super::reload::{self, ReloadChannel, RELOAD_PATH};
use super::static_files::{self, StaticFileServer, TransformTable};
use axum::{
    extract::{Request, State},
    http::{Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{any, get},
    Router,
};
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use std::fmt;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info, Level};

const API_PREFIX: &str = "/api";

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub files: StaticFileServer,
    pub reload: ReloadChannel,
}

impl AppState {
    /// Builds handler state for `config`. In watch mode HTML responses get the
    /// live-reload client injected.
    pub fn from_config(config: &ServerConfig, reload: ReloadChannel) -> Self {
        let mut transforms = TransformTable::new();
        if config.watch {
            transforms.register("html", reload::inject_client);
            transforms.register("htm", reload::inject_client);
        }
        let resolver = PathResolver::new(&config.directory, config.prefix.as_str());
        Self {
            files: StaticFileServer::new(resolver, transforms, config.spa),
            reload,
        }
    }
}

/// # Create Axum Application (`create_app`)
///
/// Constructs the router with its routes, the request logger and CORS.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route(RELOAD_PATH, get(handle_reload))
        .route(API_PREFIX, any(handle_api))
        .route("/api/", any(handle_api))
        .route("/api/{*rest}", any(handle_api))
        .fallback(handle_static)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(log_request))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Opens the event stream for one browser tab.
async fn handle_reload(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.reload.register();
    let stream = subscription
        .map(|event| Ok(Event::default().event(event.name()).data(event.name())));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Reserved API namespace. Validates the version segment, then reports that
/// no endpoint exists.
async fn handle_api(uri: Uri) -> Response {
    let rest = uri.path().strip_prefix(API_PREFIX).unwrap_or_default();
    let mut segments = rest.trim_start_matches('/').splitn(2, '/');
    let version = segments.next().unwrap_or_default();

    let message = match parse_api_version(version) {
        Some(v) => format!("No such endpoint in API version {}: {}", v, uri.path()),
        None => format!("Unknown API version '{}'", version),
    };
    (StatusCode::NOT_FOUND, message).into_response()
}

/// Accepts `1`, `v1`, `V2`, ...
fn parse_api_version(segment: &str) -> Option<u32> {
    let digits = segment
        .strip_prefix(['v', 'V'])
        .unwrap_or(segment);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

async fn handle_static(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let path = uri.path();
    if !path.starts_with('/') || !(method == Method::GET || method == Method::HEAD) {
        return static_files::not_found(path);
    }
    state.files.serve(path).await
}

/// Status-code range used to classify request log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 1xx, 2xx and 3xx.
    Success,
    /// 4xx.
    ClientError,
    /// 5xx and above.
    ServerError,
}

impl StatusClass {
    pub fn of(status: StatusCode) -> Self {
        match status.as_u16() {
            400..=499 => StatusClass::ClientError,
            500.. => StatusClass::ServerError,
            _ => StatusClass::Success,
        }
    }

    /// Log level for a request in this class. A 404 is ordinary traffic while
    /// developing, so only server errors are raised above info.
    pub fn level(self) -> Level {
        match self {
            StatusClass::ServerError => Level::ERROR,
            StatusClass::ClientError | StatusClass::Success => Level::INFO,
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StatusClass::Success => "success",
            StatusClass::ClientError => "client_error",
            StatusClass::ServerError => "server_error",
        })
    }
}

/// Request logging middleware.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let elapsed = started.elapsed();
    let status = response.status();
    let class = StatusClass::of(status);
    if class.level() == Level::ERROR {
        error!(
            %class,
            "{} {} {} {:.2?}",
            method,
            path,
            status.as_u16(),
            elapsed
        );
    } else {
        info!(
            %class,
            "{} {} {} {:.2?}",
            method,
            path,
            status.as_u16(),
            elapsed
        );
    }
    response
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::header;
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn fixture() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        std::fs::write(root.join("index.html"), "<html><body>home</body></html>").unwrap();
        std::fs::create_dir(root.join("docs")).unwrap();
        std::fs::write(root.join("docs").join("index.html"), "<p>docs</p>").unwrap();
        std::fs::create_dir(root.join("etc")).unwrap();
        std::fs::write(root.join("etc").join("passwd"), "inside the root").unwrap();
        temp_dir
    }

    fn app_for(root: &Path, watch: bool) -> (Router, ReloadChannel) {
        let config = ServerConfig {
            directory: root.to_path_buf(),
            watch,
            ..ServerConfig::default()
        };
        let reload = ReloadChannel::new();
        (create_app(AppState::from_config(&config, reload.clone())), reload)
    }

    fn get_request(uri: &str) -> Request {
        axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_status_class() {
        assert_eq!(StatusClass::of(StatusCode::OK), StatusClass::Success);
        assert_eq!(StatusClass::of(StatusCode::NOT_MODIFIED), StatusClass::Success);
        assert_eq!(StatusClass::of(StatusCode::NOT_FOUND), StatusClass::ClientError);
        assert_eq!(
            StatusClass::of(StatusCode::INTERNAL_SERVER_ERROR),
            StatusClass::ServerError
        );
    }

    #[test]
    fn test_not_found_logs_at_info() {
        assert_eq!(StatusClass::of(StatusCode::NOT_FOUND).level(), Level::INFO);
        assert_eq!(StatusClass::of(StatusCode::FORBIDDEN).level(), Level::INFO);
        assert_eq!(StatusClass::of(StatusCode::OK).level(), Level::INFO);
        assert_eq!(
            StatusClass::of(StatusCode::BAD_GATEWAY).level(),
            Level::ERROR
        );
        assert_eq!(StatusClass::ClientError.to_string(), "client_error");
    }

    #[test]
    fn test_parse_api_version() {
        assert_eq!(parse_api_version("v1"), Some(1));
        assert_eq!(parse_api_version("V12"), Some(12));
        assert_eq!(parse_api_version("3"), Some(3));
        assert_eq!(parse_api_version("v"), None);
        assert_eq!(parse_api_version(""), None);
        assert_eq!(parse_api_version("latest"), None);
        assert_eq!(parse_api_version("v-1"), None);
    }

    #[tokio::test]
    async fn test_directory_request_serves_index_html() {
        let dir = fixture();
        let (app, _) = app_for(dir.path(), false);

        let response = app.oneshot(get_request("/docs/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let ct = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(ct.starts_with("text/html"));
        assert_eq!(body_string(response).await, "<p>docs</p>");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found_and_server_keeps_serving() {
        let dir = fixture();
        let (app, _) = app_for(dir.path(), false);

        let response = app.clone().oneshot(get_request("/missing.css")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_traversal_stays_in_root() {
        let dir = fixture();
        let (app, _) = app_for(dir.path(), false);

        let response = app
            .clone()
            .oneshot(get_request("/../../etc/passwd"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "inside the root");

        let response = app
            .oneshot(get_request("/%2e%2e/%2e%2e/etc/passwd"))
            .await
            .unwrap();
        assert_eq!(body_string(response).await, "inside the root");
    }

    #[tokio::test]
    async fn test_non_get_static_request_is_not_found() {
        let dir = fixture();
        let (app, _) = app_for(dir.path(), false);
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/index.html")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_namespace_is_always_not_found() {
        let dir = fixture();
        let (app, _) = app_for(dir.path(), false);

        let response = app.clone().oneshot(get_request("/api/v1/users")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.contains("No such endpoint"));

        for uri in ["/api/nope/users", "/api", "/api/"] {
            let response = app.clone().oneshot(get_request(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            assert!(body_string(response).await.contains("Unknown API version"));
        }
    }

    #[tokio::test]
    async fn test_watch_mode_injects_reload_client() {
        let dir = fixture();

        let (app, _) = app_for(dir.path(), true);
        let html = body_string(app.oneshot(get_request("/")).await.unwrap()).await;
        assert!(html.contains("new EventSource(\"/reload\")"));

        let (app, _) = app_for(dir.path(), false);
        let html = body_string(app.oneshot(get_request("/")).await.unwrap()).await;
        assert!(!html.contains("EventSource"));
    }

    #[tokio::test]
    async fn test_reload_stream_registers_and_receives_events() {
        let dir = fixture();
        let (app, reload) = app_for(dir.path(), true);

        let response = app.oneshot(get_request("/reload")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(reload.client_count(), 1);

        let mut body = response.into_body().into_data_stream();
        assert_eq!(reload.broadcast(), 1);
        let chunk = body.next().await.unwrap().unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        assert!(text.contains("event: reload"));

        drop(body);
        assert_eq!(reload.client_count(), 0);
    }

    #[tokio::test]
    async fn test_cors_headers_present() {
        let dir = fixture();
        let (app, _) = app_for(dir.path(), false);
        let request = axum::http::Request::builder()
            .uri("/")
            .header(header::ORIGIN, "http://example.test")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
