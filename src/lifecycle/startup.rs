//! Startup orchestration.
//!
//! # Responsibilities
//! - Load templates and compile the route table
//! - Prepare the mirror directory and start the mirror loop
//! - Bind listeners and begin accepting traffic
//! - Stop background tasks once the listeners are done
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::backends::ProxyTargetError;
use crate::config::SiteConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::mirror::MirrorSync;
use crate::template::{TemplateError, Templates};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("loading templates: {0}")]
    Templates(#[from] TemplateError),

    #[error("building routes: {0}")]
    Routes(#[from] ProxyTargetError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Run the site until a stop signal arrives or a listener fails.
pub async fn run(config: SiteConfig) -> Result<(), StartupError> {
    let config = Arc::new(config);

    let template_dir = config.template_dir();
    let templates = Templates::load(&template_dir)?;
    tracing::info!(dir = %template_dir.display(), "Templates loaded");

    let server = HttpServer::new(config.clone(), templates)?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    prepare_mirror_dir(&config.mirror_dir()).await;
    let mirror = MirrorSync::from_config(&config)
        .map(|sync| tokio::spawn(sync.run(shutdown.subscribe())));

    let result = server.run(&shutdown).await;

    shutdown.trigger();
    if let Some(task) = mirror {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Mirror task ended abnormally");
        }
    }

    result?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Create the mirror directory, owner-only. Failures are logged and
/// otherwise ignored; the sync tool reports a missing directory itself.
async fn prepare_mirror_dir(path: &Path) {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);

    if let Err(e) = builder.create(path).await {
        tracing::debug!(path = %path.display(), error = %e, "Could not create mirror directory");
    }
}
