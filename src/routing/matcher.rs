//! Route matching logic.
//!
//! # Responsibilities
//! - Match host header (exact match, case-insensitive, port ignored)
//! - Match exact paths and path prefixes (case-sensitive)
//! - Combine conditions with AND semantics
//! - Report how specific each condition is
//!
//! # Design Decisions
//! - Host matching is case-insensitive (per HTTP spec)
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching

use axum::body::Body;
use axum::http::Request;

use crate::http::request::{request_host, strip_port};

/// How specific a matcher is; larger sorts first.
///
/// Field order gives the precedence: host-keyed beats host-less, then an
/// exact path beats a prefix, then longer literals beat shorter ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    pub host: bool,
    pub exact: bool,
    pub len: usize,
}

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request<Body>) -> bool;

    fn specificity(&self) -> Specificity;
}

/// Matches the Host header.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        request_host(req)
            .map(|h| strip_port(h).eq_ignore_ascii_case(&self.expected_host))
            .unwrap_or(false)
    }

    fn specificity(&self) -> Specificity {
        Specificity {
            host: true,
            ..Specificity::default()
        }
    }
}

/// Matches one literal path.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    path: String,
}

impl ExactPathMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Matcher for ExactPathMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        req.uri().path() == self.path
    }

    fn specificity(&self) -> Specificity {
        Specificity {
            host: false,
            exact: true,
            len: self.path.len(),
        }
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        req.uri().path().starts_with(&self.prefix)
    }

    fn specificity(&self) -> Specificity {
        Specificity {
            host: false,
            exact: false,
            len: self.prefix.len(),
        }
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.matchers.iter().all(|m| m.matches(req))
    }

    fn specificity(&self) -> Specificity {
        self.matchers
            .iter()
            .map(|m| m.specificity())
            .fold(Specificity::default(), |acc, s| Specificity {
                host: acc.host || s.host,
                exact: acc.exact || s.exact,
                len: acc.len + s.len,
            })
    }
}
