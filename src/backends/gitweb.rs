//! Source browser binding: gitweb CGI plus its static assets, behind the
//! corrupted-URL fixer.

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::backends::cgi::CgiHandler;
use crate::backends::static_files::StaticTree;
use crate::http::request::request_uri;
use crate::http::response::found;

/// Sends the index and query URLs to the CGI program and everything else
/// under the mount point to the static asset tree.
#[derive(Debug, Clone)]
pub struct GitwebHandler {
    mount: String,
    cgi: CgiHandler,
    assets: StaticTree,
}

impl GitwebHandler {
    pub fn new(mount: impl Into<String>, cgi: CgiHandler, assets: StaticTree) -> Self {
        Self {
            mount: mount.into(),
            cgi,
            assets,
        }
    }

    /// True when the CGI program should answer this request.
    pub fn is_cgi_request(&self, req: &Request<Body>) -> bool {
        req.uri().path() == self.mount
            || request_uri(req)
                .strip_prefix(self.mount.as_str())
                .is_some_and(|rest| rest.starts_with('?'))
    }

    pub async fn serve(&self, req: Request<Body>) -> Response {
        if self.is_cgi_request(&req) {
            self.cgi.serve(req).await
        } else {
            self.assets.serve(req).await
        }
    }
}

/// Redirects URLs carrying a mangled delimiter to their repaired form.
#[derive(Debug, Clone)]
pub struct UrlFixer {
    corrupted: String,
    replacement: String,
    inner: GitwebHandler,
}

impl UrlFixer {
    pub fn new(
        corrupted: impl Into<String>,
        replacement: impl Into<String>,
        inner: GitwebHandler,
    ) -> Self {
        Self {
            corrupted: corrupted.into(),
            replacement: replacement.into(),
            inner,
        }
    }

    /// Repaired URI, or `None` when the raw URI is clean.
    pub fn fixed_uri(&self, raw: &str) -> Option<String> {
        if self.corrupted.is_empty() || !raw.contains(self.corrupted.as_str()) {
            return None;
        }
        Some(raw.replace(self.corrupted.as_str(), &self.replacement))
    }

    pub async fn serve(&self, req: Request<Body>) -> Response {
        match self.fixed_uri(request_uri(&req)) {
            Some(location) => {
                tracing::debug!(from = %request_uri(&req), to = %location, "Fixing corrupted URL");
                found(&location)
            }
            None => self.inner.serve(req).await,
        }
    }
}
