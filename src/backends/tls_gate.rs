//! HTTPS gate in front of the code-review proxy.

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::backends::proxy::ReverseProxy;
use crate::http::request::{request_uri, transport};
use crate::http::response::found;

/// Proxies TLS requests and bounces plaintext ones to HTTPS when the
/// process serves HTTPS at all.
#[derive(Debug, Clone)]
pub struct TlsGate {
    proxy: ReverseProxy,
    https_enabled: bool,
    canonical_host: String,
}

impl TlsGate {
    pub fn new(proxy: ReverseProxy, https_enabled: bool, canonical_host: impl Into<String>) -> Self {
        Self {
            proxy,
            https_enabled,
            canonical_host: canonical_host.into(),
        }
    }

    /// Redirect target for a plaintext request, if one is required.
    pub fn redirect_target(&self, req: &Request<Body>) -> Option<String> {
        if !self.https_enabled || transport(req).is_tls() {
            return None;
        }
        Some(format!("https://{}{}", self.canonical_host, request_uri(req)))
    }

    pub async fn serve(&self, req: Request<Body>) -> Response {
        match self.redirect_target(&req) {
            Some(location) => found(&location),
            None => self.proxy.serve(req).await,
        }
    }
}
