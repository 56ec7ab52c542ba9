//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! built-in defaults
//!     → loader.rs (optional TOML file)
//!     → cli.rs (command-line overrides)
//!     → validation.rs (semantic checks)
//!     → SiteConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{finalize, load_config, ConfigError};
pub use schema::BuildbotConfig;
pub use schema::DiagnosticsConfig;
pub use schema::FilterConfig;
pub use schema::GerritConfig;
pub use schema::GitwebConfig;
pub use schema::ListenerConfig;
pub use schema::LoggingConfig;
pub use schema::SiteConfig;
pub use schema::SiteSettings;
pub use schema::TlsConfig;
