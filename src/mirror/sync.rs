//! Periodic rsync of the code-review host's git store.
//!
//! # Responsibilities
//! - Run the sync tool against the configured remote on a fixed interval
//! - Log failures and keep going
//! - Stop promptly when shutdown is signalled
//!
//! # Design Decisions
//! - No backoff: the delay between attempts is the same after a failure
//! - A sync in progress at shutdown is killed with its task

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::sync::broadcast;
use tokio::time::sleep;

use crate::config::SiteConfig;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("running {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Mirrors `<user>@<host>:<remote_path>` into a local directory.
#[derive(Debug, Clone)]
pub struct MirrorSync {
    program: String,
    source: String,
    dest: PathBuf,
    interval: Duration,
}

impl MirrorSync {
    pub fn new(
        program: impl Into<String>,
        source: impl Into<String>,
        dest: impl Into<PathBuf>,
        interval: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            source: source.into(),
            dest: dest.into(),
            interval,
        }
    }

    /// The configured mirror, or `None` when no review host is set.
    pub fn from_config(config: &SiteConfig) -> Option<Self> {
        let gerrit = &config.gerrit;
        let host = gerrit.host.as_deref().filter(|h| !h.is_empty())?;
        Some(Self::new(
            &gerrit.rsync_program,
            format!("{}@{}:{}", gerrit.user, host, gerrit.remote_path),
            config.mirror_dir(),
            Duration::from_secs(gerrit.sync_interval_secs),
        ))
    }

    /// Arguments passed to the sync program.
    pub fn args(&self) -> Vec<String> {
        let dest = self.dest.display().to_string();
        let dest = if dest.ends_with('/') {
            dest
        } else {
            format!("{}/", dest)
        };
        vec!["-avPW".to_string(), self.source.clone(), dest]
    }

    /// Run one sync to completion.
    pub async fn sync_once(&self) -> Result<(), SyncError> {
        let output = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| SyncError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(SyncError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            source = %self.source,
            dest = %self.dest.display(),
            interval_secs = self.interval.as_secs(),
            "Mirror sync starting"
        );

        loop {
            tokio::select! {
                result = self.sync_once() => match result {
                    Ok(()) => tracing::debug!(source = %self.source, "Mirror sync complete"),
                    Err(e) => tracing::warn!(error = %e, "Mirror sync failed"),
                },
                _ = shutdown.recv() => break,
            }

            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("Mirror sync received shutdown signal, exiting loop");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let mut config = SiteConfig::default();
        config.site.root = "/srv/site".into();
        assert!(MirrorSync::from_config(&config).is_none());

        config.gerrit.host = Some("review.internal".into());
        let sync = MirrorSync::from_config(&config).unwrap();
        assert_eq!(
            sync.args(),
            vec!["-avPW", "ubuntu@review.internal:gerrit/git/", "/srv/site/latestgits/"]
        );
        assert_eq!(sync.interval, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let sync = MirrorSync::new("/nonexistent/rsync", "u@h:x/", "/tmp/m", Duration::from_secs(1));
        assert!(matches!(sync.sync_once().await, Err(SyncError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status() {
        let ok = MirrorSync::new("true", "u@h:x/", "/tmp/m", Duration::from_secs(1));
        assert!(ok.sync_once().await.is_ok());

        let failing = MirrorSync::new("false", "u@h:x/", "/tmp/m", Duration::from_secs(1));
        assert!(matches!(failing.sync_once().await, Err(SyncError::Failed { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_reports_stderr_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("rsync");
        std::fs::write(
            &program,
            "#!/bin/sh\necho 'sending incremental file list'\necho 'connection refused' >&2\nexit 12\n",
        )
        .unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let sync = MirrorSync::new(
            program.display().to_string(),
            "u@h:x/",
            dir.path().join("m"),
            Duration::from_secs(1),
        );
        match sync.sync_once().await {
            Err(SyncError::Failed { stderr, .. }) => assert_eq!(stderr, "connection refused"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let (tx, rx) = broadcast::channel(1);
        let sync = MirrorSync::new("true", "u@h:x/", "/tmp/m", Duration::from_secs(3600));
        let task = tokio::spawn(sync.run(rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("mirror loop did not stop")
            .unwrap();
    }
}
