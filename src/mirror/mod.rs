//! Background mirror of the review host's git repositories.
//!
//! The mirror directory is read by the gitweb CGI program through
//! `CAMWEB_GITDIR`; nothing else in the server touches it.

pub mod sync;

pub use sync::{MirrorSync, SyncError};
