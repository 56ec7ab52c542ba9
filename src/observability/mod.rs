//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → tower_http TraceLayer (per-request spans with request IDs)
//!
//! Consumers:
//!     → stdout
//!     → hourly rolling files under the log directory
//! ```

pub mod logging;

pub use logging::init_logging;
