//! URL/Host filter middleware.
//! Blocks crawler storms on the source browser and canonicalizes the
//! secondary hostname, before any routing.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::config::SiteConfig;
use crate::http::request::{request_host, request_uri, user_agent};
use crate::http::response::{found, unauthorized};

#[derive(Debug, Clone)]
pub struct HostFilter {
    bot_agents: Vec<String>,
    protected_path: String,
    secondary_host: String,
    canonical_host: String,
}

/// What the filter decided for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    DenyBot,
    Redirect(String),
}

impl HostFilter {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            bot_agents: config.filter.bot_agents.clone(),
            protected_path: config.filter.protected_path.clone(),
            secondary_host: config.site.secondary_host.to_lowercase(),
            canonical_host: config.site.canonical_host.clone(),
        }
    }

    fn is_bot(&self, agent: &str) -> bool {
        self.bot_agents
            .iter()
            .any(|bot| !bot.is_empty() && agent.contains(bot.as_str()))
    }

    pub fn check(&self, req: &Request<Body>) -> Verdict {
        let uri = request_uri(req);

        // Bots first, so a bot on the secondary host is not bounced around.
        if !self.protected_path.is_empty()
            && uri.contains(self.protected_path.as_str())
            && uri.contains('?')
            && self.is_bot(user_agent(req))
        {
            return Verdict::DenyBot;
        }

        let host = request_host(req).unwrap_or_default();
        if !self.secondary_host.is_empty() && host.to_lowercase() == self.secondary_host {
            return Verdict::Redirect(format!("http://{}{}", self.canonical_host, uri));
        }

        Verdict::Pass
    }
}

pub async fn host_filter_middleware(
    State(filter): State<Arc<HostFilter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    match filter.check(&req) {
        Verdict::Pass => next.run(req).await,
        Verdict::DenyBot => {
            warn!(
                user_agent = %user_agent(&req),
                uri = %request_uri(&req),
                "bot denied"
            );
            unauthorized("bye")
        }
        Verdict::Redirect(location) => {
            debug!(to = %location, "Redirecting to canonical host");
            found(&location)
        }
    }
}
