//! Site content: file resolution under `<root>/content` and the templated
//! fallback page handler.

pub mod pages;
pub mod resolver;

pub use pages::ContentPages;
pub use resolver::{extract_title, ContentError, ContentFile, ContentResolver};
