//! Redirect-only adapters.

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::http::request::request_uri;
use crate::http::response::{bad_request, found};

/// Always redirects to one location.
#[derive(Debug, Clone)]
pub struct FixedRedirect {
    location: String,
}

impl FixedRedirect {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    pub fn serve(&self) -> Response {
        found(&self.location)
    }
}

/// `/issue/<digits>` → external tracker.
#[derive(Debug, Clone)]
pub struct IssueRedirect {
    prefix: String,
    tracker_url: String,
}

impl IssueRedirect {
    pub fn new(prefix: impl Into<String>, tracker_url: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            tracker_url: tracker_url.into(),
        }
    }

    /// Tracker location for `path`, if the remainder is a bare issue number.
    pub fn location(&self, path: &str) -> Option<String> {
        let id = path.strip_prefix(self.prefix.as_str())?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(format!("{}{}", self.tracker_url, id))
    }

    pub fn serve(&self, req: &Request<Body>) -> Response {
        match self.location(req.uri().path()) {
            Some(location) => found(&location),
            None => bad_request(),
        }
    }
}

/// Sends documentation paths to an external documentation server,
/// path and query intact.
#[derive(Debug, Clone)]
pub struct DocsRedirect {
    base_url: String,
}

impl DocsRedirect {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn location(&self, req: &Request<Body>) -> String {
        format!("{}{}", self.base_url, request_uri(req))
    }

    pub fn serve(&self, req: &Request<Body>) -> Response {
        found(&self.location(req))
    }
}

/// Location for the `/gw/<path>` shortcut into the source browser.
pub fn gitweb_shortcut(canonical_host: &str, repo: &str, path: &str) -> String {
    format!(
        "http://{}/code/?p={};f={};hb=master",
        canonical_host, repo, path
    )
}
