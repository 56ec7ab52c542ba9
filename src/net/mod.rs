//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → plaintext: axum::serve on a tokio TcpListener
//!     → TLS: tls.rs (PEM material) → axum-server rustls acceptor
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - TLS is optional and handled transparently
//! - Certificates are loaded once at startup

pub mod tls;

pub use tls::load_tls_config;
