//! Static asset stage.
//!
//! `GET`/`HEAD` requests are first offered to a [`ServeDir`] rooted at the
//! public directory. A hit is answered directly; a miss (including any path
//! that tries to climb out of the root) falls through to the next stage.
//! Dotfiles are never served, and a failure reading from disk goes to the
//! error fallback.

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use super::errors::{PipelineError, PipelineResult};

/// Files served from the public directory
#[derive(Debug, Clone)]
pub struct StaticAssets {
    root: PathBuf,
    serve_dir: ServeDir,
}

impl StaticAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let serve_dir = ServeDir::new(&root).append_index_html_on_directories(true);
        Self { root, serve_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Try to answer from disk; `None` when nothing matches
    async fn lookup(&self, lookup_req: Request) -> PipelineResult<Option<Response>> {
        let path = lookup_req.uri().path().to_string();
        let response = match self.serve_dir.clone().oneshot(lookup_req).await {
            Ok(response) => response,
            Err(never) => match never {},
        };

        let status = response.status();
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED) {
            return Ok(None);
        }
        if status.is_server_error() {
            return Err(PipelineError::Internal(format!(
                "static asset {} could not be read ({})",
                path, status
            )));
        }
        Ok(Some(response.map(Body::new)))
    }
}

/// Whether any path segment names a hidden file or directory
fn is_hidden(path: &str) -> bool {
    path.split('/').any(|segment| {
        segment.starts_with('.')
            || segment
                .get(..3)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("%2e"))
    })
}

pub async fn serve_static(
    State(assets): State<StaticAssets>,
    request: Request,
    next: Next,
) -> PipelineResult<Response> {
    if !matches!(*request.method(), Method::GET | Method::HEAD) || is_hidden(request.uri().path())
    {
        return Ok(next.run(request).await);
    }

    // Only the request head is offered to disk; the body stays with the
    // original request in case it falls through.
    let mut lookup_req = Request::new(Body::empty());
    *lookup_req.method_mut() = request.method().clone();
    *lookup_req.uri_mut() = request.uri().clone();
    *lookup_req.headers_mut() = request.headers().clone();

    match assets.lookup(lookup_req).await? {
        Some(response) => Ok(response),
        None => Ok(next.run(request).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::header::CONTENT_TYPE;
    use axum::routing::get;
    use axum::{middleware, Router};

    fn router(root: &Path) -> Router {
        Router::new()
            .route("/fallthrough", get(|| async { "next stage" }))
            .layer(middleware::from_fn_with_state(
                StaticAssets::new(root),
                serve_static,
            ))
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = router
            .oneshot(
                axum::http::Request::get(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn test_serves_file_with_content_type() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("style.css"), "body { color: brown; }").unwrap();

        let (status, content_type, body) = get_body(router(dir.path()), "/style.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("text/css"));
        assert_eq!(body, "body { color: brown; }");
    }

    #[tokio::test]
    async fn test_missing_file_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _, body) = get_body(router(dir.path()), "/fallthrough").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "next stage");
    }

    #[tokio::test]
    async fn test_directory_serves_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("guide")).unwrap();
        std::fs::write(dir.path().join("guide/index.html"), "<h1>guide</h1>").unwrap();

        let (status, _, body) = get_body(router(dir.path()), "/guide/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>guide</h1>");
    }

    #[test]
    fn test_hidden_segments() {
        assert!(is_hidden("/.env"));
        assert!(is_hidden("/.git/config"));
        assert!(is_hidden("/assets/%2Ehtaccess"));
        assert!(!is_hidden("/css/site.css"));
        assert!(!is_hidden("/"));
    }

    #[tokio::test]
    async fn test_dotfiles_fall_through() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "PASS_EMAIL=hunter2").unwrap();

        let (status, _, body) = get_body(router(dir.path()), "/.env").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.contains("hunter2"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_asset_is_pipeline_error() {
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(dir.path().join("loop"), dir.path().join("loop")).unwrap();

        let (status, content_type, body) = get_body(router(dir.path()), "/loop").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert!(body.contains("Something wrong!"));
    }
}
