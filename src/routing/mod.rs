//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: matched Route or None (content fallback)
//!
//! Route Compilation (at startup):
//!     SiteConfig
//!     → table.rs (register routes in fixed order)
//!     → Sort by specificity, registration order breaks ties
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (exact and prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins

pub mod matcher;
pub mod router;
pub mod table;

pub use router::{Route, Router};
pub use table::site_routes;
