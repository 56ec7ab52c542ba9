//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, transport tag, request ID, timeouts)
//!     → middleware/host_filter.rs (bot denial, canonical host)
//!     → server.rs dispatch (route table or content fallback)
//!     → backends (static, proxy, CGI, redirects)
//!     → response.rs helpers
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{Transport, UuidRequestId, X_REQUEST_ID};
pub use server::{HttpServer, ServerError, SiteState};
