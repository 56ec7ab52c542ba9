//! Backend adapters.
//!
//! # Data Flow
//! ```text
//! Dispatcher (matched route)
//!     → Backend::serve
//!         → static_files (ServeDir)
//!         → proxy (hyper client) / tls_gate (redirect or proxy)
//!         → gitweb (URL fixer → CGI process or asset tree)
//!         → redirects / diagnostics
//!     → Response
//! ```
//!
//! # Design Decisions
//! - Closed set of adapters as an enum, not trait objects
//! - Descriptors are immutable after startup
//! - Every adapter answers with a `Response`; failures are mapped inside

pub mod cgi;
pub mod diagnostics;
pub mod gitweb;
pub mod proxy;
pub mod redirects;
pub mod static_files;
pub mod tls_gate;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

pub use cgi::{CgiError, CgiHandler};
pub use diagnostics::InterfaceAddr;
pub use gitweb::{GitwebHandler, UrlFixer};
pub use proxy::{ProxyTargetError, ReverseProxy};
pub use redirects::{DocsRedirect, FixedRedirect, IssueRedirect};
pub use static_files::StaticTree;
pub use tls_gate::TlsGate;

/// The adapter a route is bound to.
#[derive(Debug, Clone)]
pub enum Backend {
    Static(StaticTree),
    Proxy(ReverseProxy),
    TlsGated(TlsGate),
    Gitweb(UrlFixer),
    Redirect(FixedRedirect),
    Issue(IssueRedirect),
    Docs(DocsRedirect),
    InterfaceAddr(InterfaceAddr),
}

impl Backend {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Backend::Static(_) => "static",
            Backend::Proxy(_) => "proxy",
            Backend::TlsGated(_) => "tls-gated-proxy",
            Backend::Gitweb(_) => "gitweb",
            Backend::Redirect(_) => "redirect",
            Backend::Issue(_) => "issue",
            Backend::Docs(_) => "docs",
            Backend::InterfaceAddr(_) => "interface-addr",
        }
    }

    pub async fn serve(&self, req: Request<Body>) -> Response {
        match self {
            Backend::Static(tree) => tree.serve(req).await,
            Backend::Proxy(proxy) => proxy.serve(req).await,
            Backend::TlsGated(gate) => gate.serve(req).await,
            Backend::Gitweb(fixer) => fixer.serve(req).await,
            Backend::Redirect(redirect) => redirect.serve(),
            Backend::Issue(issues) => issues.serve(&req),
            Backend::Docs(docs) => docs.serve(&req),
            Backend::InterfaceAddr(diag) => diag.serve().await,
        }
    }
}
