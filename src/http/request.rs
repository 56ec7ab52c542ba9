//! Request inspection helpers.
//!
//! # Responsibilities
//! - Tag each request with the transport it arrived on
//! - Generate a UUID v4 request ID as early as possible for tracing
//! - Extract routing-relevant information (host, raw URI, decoded path,
//!   peer address)
//!
//! # Design Decisions
//! - Each listener's router carries its own `Transport` extension, so the
//!   TLS-present flag is a property of the listener, not of headers
//! - The raw request URI is used as received; nothing is re-encoded
//! - File lookups and CGI `PATH_INFO` use the percent-decoded path

use std::borrow::Cow;
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderValue, Request};
use percent_encoding::percent_decode_str;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _req: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Which listener a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Plain,
    Tls,
}

impl Transport {
    pub fn is_tls(self) -> bool {
        self == Transport::Tls
    }
}

/// Transport of `req`; requests without the extension count as plaintext.
pub fn transport(req: &Request<Body>) -> Transport {
    req.extensions().get::<Transport>().copied().unwrap_or_default()
}

/// The Host header, falling back to the URI authority (HTTP/2).
pub fn request_host(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
}

/// Host without any `:port` suffix.
pub fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal
        return host.split_once(']').map(|(h, _)| &host[..h.len() + 1]).unwrap_or(host);
    }
    host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host)
}

/// Path and query exactly as the client sent them.
pub fn request_uri(req: &Request<Body>) -> &str {
    req.uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| req.uri().path())
}

/// Percent-decoded request path. `None` when the decoded bytes are not
/// UTF-8.
pub fn decoded_path(req: &Request<Body>) -> Option<Cow<'_, str>> {
    percent_decode_str(req.uri().path()).decode_utf8().ok()
}

/// Peer address, when the server was started with connect info.
pub fn remote_addr(req: &Request<Body>) -> Option<SocketAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

pub fn user_agent(req: &Request<Body>) -> &str {
    req.headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
