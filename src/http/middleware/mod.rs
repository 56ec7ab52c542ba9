pub mod host_filter;

pub use host_filter::{host_filter_middleware, HostFilter, Verdict};
