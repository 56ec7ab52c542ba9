//! Single-host reverse proxy.
//!
//! # Responsibilities
//! - Rewrite the request URI onto a fixed upstream origin
//! - Forward method, headers and a streaming body
//! - Return the upstream response verbatim, minus hop-by-hop headers
//!
//! # Design Decisions
//! - The upstream base path is joined with the request path with exactly one
//!   slash between them; query strings are concatenated with `&`
//! - The client's Host header is forwarded unchanged
//! - Failures become 502; nothing is retried

use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{HeaderMap, HeaderValue, Request, Uri, Version};
use axum::response::{IntoResponse, Response};
use hyper::header::{self, HeaderName};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::http::request::remote_addr;
use crate::http::response::bad_gateway;

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: &[HeaderName] = &[
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Debug, thiserror::Error)]
pub enum ProxyTargetError {
    #[error("invalid upstream URL {0:?}")]
    InvalidUri(String),

    #[error("upstream URL {0:?} must be absolute http")]
    NotHttp(String),
}

/// Reverse proxy to one upstream origin.
#[derive(Debug, Clone)]
pub struct ReverseProxy {
    scheme: Scheme,
    authority: Authority,
    base_path: String,
    base_query: Option<String>,
    client: Client<HttpConnector, Body>,
}

impl ReverseProxy {
    pub fn new(target: &str) -> Result<Self, ProxyTargetError> {
        let uri: Uri = target
            .parse()
            .map_err(|_| ProxyTargetError::InvalidUri(target.to_string()))?;
        let (Some(scheme), Some(authority)) = (uri.scheme().cloned(), uri.authority().cloned())
        else {
            return Err(ProxyTargetError::NotHttp(target.to_string()));
        };
        if scheme != Scheme::HTTP {
            return Err(ProxyTargetError::NotHttp(target.to_string()));
        }

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            scheme,
            authority,
            base_path: uri.path().to_string(),
            base_query: uri.query().map(str::to_string),
            client,
        })
    }

    /// Upstream URI for a request URI.
    pub fn upstream_uri(&self, uri: &Uri) -> Option<Uri> {
        let path = join_paths(&self.base_path, uri.path());
        let query = match (self.base_query.as_deref(), uri.query()) {
            (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => Some(format!("{}&{}", a, b)),
            (Some(a), _) if !a.is_empty() => Some(a.to_string()),
            (_, Some(b)) => Some(b.to_string()),
            _ => None,
        };
        let path_and_query = match query {
            Some(q) => format!("{}?{}", path, q),
            None => path,
        };
        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(PathAndQuery::try_from(path_and_query).ok()?)
            .build()
            .ok()
    }

    pub async fn serve(&self, req: Request<Body>) -> Response {
        let peer = remote_addr(&req);
        let (mut parts, body) = req.into_parts();

        let Some(uri) = self.upstream_uri(&parts.uri) else {
            tracing::error!(uri = %parts.uri, "Could not build upstream URI");
            return bad_gateway();
        };

        strip_hop_by_hop(&mut parts.headers);
        if let Some(peer) = peer {
            append_forwarded_for(&mut parts.headers, &peer.ip().to_string());
        }
        parts.uri = uri;
        parts.version = Version::HTTP_11;

        let upstream_req = Request::from_parts(parts, body);
        let target = upstream_req.uri().clone();

        match self.client.request(upstream_req).await {
            Ok(response) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Response::from_parts(parts, Body::new(body)).into_response()
            }
            Err(e) => {
                tracing::error!(upstream = %target, error = %e, "Upstream error");
                bad_gateway()
            }
        }
    }
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in Connection are connection-scoped too.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named.iter().chain(HOP_BY_HOP) {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: &str) {
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, ip),
        None => ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_uri_joins_paths() {
        let proxy = ReverseProxy::new("http://review.internal:8000/").unwrap();
        let uri: Uri = "/r/c/123?x=1".parse().unwrap();
        let upstream = proxy.upstream_uri(&uri).unwrap();
        assert_eq!(upstream.to_string(), "http://review.internal:8000/r/c/123?x=1");
    }

    #[test]
    fn test_upstream_uri_merges_queries() {
        let proxy = ReverseProxy::new("http://127.0.0.1:8010/bb?theme=dark").unwrap();
        let uri: Uri = "/waterfall?branch=master".parse().unwrap();
        let upstream = proxy.upstream_uri(&uri).unwrap();
        assert_eq!(
            upstream.to_string(),
            "http://127.0.0.1:8010/bb/waterfall?theme=dark&branch=master"
        );
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/", "/r/"), "/r/");
        assert_eq!(join_paths("/base", "/r/"), "/base/r/");
        assert_eq!(join_paths("/base/", "r"), "/base/r");
        assert_eq!(join_paths("/base", "r"), "/base/r");
    }

    #[test]
    fn test_rejects_non_http_targets() {
        assert!(ReverseProxy::new("not a url").is_err());
        assert!(ReverseProxy::new("/relative").is_err());
        assert!(ReverseProxy::new("ftp://example.org/").is_err());
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("close, x-private"));
        headers.insert("x-private", HeaderValue::from_static("1"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        strip_hop_by_hop(&mut headers);
        assert!(headers.get("x-private").is_none());
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
        assert!(headers.get(header::CONNECTION).is_none());
        assert_eq!(headers.get(header::ACCEPT).unwrap(), "*/*");
    }

    #[test]
    fn test_forwarded_for_appends() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "10.0.0.1");
        append_forwarded_for(&mut headers, "10.0.0.2");
        assert_eq!(headers.get(X_FORWARDED_FOR).unwrap(), "10.0.0.1, 10.0.0.2");
    }
}
