//! Template rendering for content and error pages.

pub mod renderer;

pub use renderer::{TemplateError, Templates, ERROR_TEMPLATE, PAGE_TEMPLATE};
