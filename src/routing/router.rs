//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Sorted once by specificity; registration order breaks ties
//! - O(n) scan (acceptable for a site-sized table)
//! - No match is `None`; the caller owns the fallback

use axum::body::Body;
use axum::http::Request;

use crate::backends::Backend;
use crate::routing::matcher::Matcher;

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub matcher: Box<dyn Matcher>,
    pub backend: Backend,
    /// Registration order.
    pub rank: usize,
}

/// Collects routes in registration order.
#[derive(Debug, Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(
        mut self,
        name: impl Into<String>,
        matcher: impl Matcher + 'static,
        backend: Backend,
    ) -> Self {
        let rank = self.routes.len();
        self.routes.push(Route {
            name: name.into(),
            matcher: Box::new(matcher),
            backend,
            rank,
        });
        self
    }

    pub fn build(mut self) -> Router {
        // Stable sort keeps registration order among equals.
        self.routes
            .sort_by_key(|route| std::cmp::Reverse(route.matcher.specificity()));
        Router {
            routes: self.routes,
        }
    }
}

/// Immutable, ordered route table.
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// First route whose matcher accepts the request.
    pub fn match_request(&self, req: &Request<Body>) -> Option<&Route> {
        self.routes.iter().find(|route| route.matcher.matches(req))
    }

    /// Routes in match order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
