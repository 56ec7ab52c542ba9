//! Front-door web server for a project site.

pub mod backends;
pub mod cli;
pub mod config;
pub mod content;
pub mod http;
pub mod lifecycle;
pub mod mirror;
pub mod net;
pub mod observability;
pub mod routing;
pub mod template;

pub use config::schema::SiteConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
