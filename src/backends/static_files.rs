//! Directory-rooted file serving.

use std::convert::Infallible;
use std::path::PathBuf;

use axum::body::Body;
use axum::http::uri::PathAndQuery;
use axum::http::{Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeDir;

/// Serves a file tree, optionally after stripping a path prefix.
#[derive(Debug, Clone)]
pub struct StaticTree {
    strip_prefix: Option<String>,
    dir: ServeDir,
}

impl StaticTree {
    /// Serve `root` at the request path unchanged (`/favicon.ico` → `root/favicon.ico`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            dir: ServeDir::new(root.into()),
            strip_prefix: None,
        }
    }

    /// Serve `root` for paths under `prefix`, with `prefix` removed.
    pub fn stripped(prefix: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            strip_prefix: Some(prefix.into()),
            ..Self::new(root)
        }
    }

    fn rewrite(&self, uri: &Uri) -> Option<Uri> {
        let Some(prefix) = &self.strip_prefix else {
            return Some(uri.clone());
        };
        let rest = uri.path().strip_prefix(prefix.as_str())?;
        let path_and_query = match uri.query() {
            Some(q) => format!("/{}?{}", rest, q),
            None => format!("/{}", rest),
        };
        let path_and_query = PathAndQuery::try_from(path_and_query).ok()?;
        Uri::builder().path_and_query(path_and_query).build().ok()
    }

    pub async fn serve(&self, mut req: Request<Body>) -> Response {
        let Some(uri) = self.rewrite(req.uri()) else {
            return StatusCode::NOT_FOUND.into_response();
        };
        *req.uri_mut() = uri;

        let result: Result<_, Infallible> = self.dir.clone().oneshot(req).await;
        match result {
            Ok(response) => response.map(Body::new),
            Err(never) => match never {},
        }
    }
}
