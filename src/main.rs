//! site-gateway
//!
//! Front-door web server for a project site.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ───────────────▶ listener (plain / TLS, tagged Transport)
//!                          │
//!                          ▼
//!                  request ID, trace span, timeouts
//!                          │
//!                          ▼
//!                  host filter (bot denial, canonical host)
//!                          │
//!                          ▼
//!                  dispatcher ──▶ route table ──▶ backend adapter
//!                          │                      (static, proxy, TLS gate,
//!                          │                       gitweb CGI, redirects)
//!                          ▼
//!                  content fallback ──▶ resolver ──▶ template renderer
//!
//!     Background: mirror sync loop (rsync) ──▶ <root>/latestgits
//! ```

use anyhow::Context;
use clap::Parser;

use site_gateway::cli::Cli;
use site_gateway::config::{finalize, load_config, SiteConfig};
use site_gateway::lifecycle;
use site_gateway::observability::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SiteConfig::default(),
    };
    cli.apply(&mut config);
    let config = finalize(config).context("invalid configuration")?;

    let _log_guard = init_logging(&config.logging).context("initializing logging")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        root = %config.site.root.display(),
        http = %config.listener.http_address,
        https = ?config.listener.https_address,
        "site-gateway starting"
    );

    lifecycle::run(config).await?;
    Ok(())
}
