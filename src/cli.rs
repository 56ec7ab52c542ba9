//! Command-line flags.
//!
//! Every flag is optional; when present it overrides the config file value.

use std::path::PathBuf;

use clap::Parser;

use crate::config::validation::normalize_listen_address;
use crate::config::{SiteConfig, TlsConfig};

#[derive(Debug, Parser)]
#[command(name = "site-gateway")]
#[command(about = "Front-door web server for the project site", long_about = None)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// HTTP service address (e.g., ':31798').
    #[arg(long)]
    pub http: Option<String>,

    /// HTTPS service address.
    #[arg(long)]
    pub https: Option<String>,

    /// Website root (parent of 'static', 'content', and 'tmpl').
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Path to gitweb.cgi, or blank to disable.
    #[arg(long)]
    pub gitweb_script: Option<String>,

    /// Path to gitweb's static files.
    #[arg(long)]
    pub gitweb_files: Option<PathBuf>,

    /// Directory to write log files to (one per hour).
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Write logs to stdout.
    #[arg(long)]
    pub log_stdout: Option<bool>,

    /// TLS cert file.
    #[arg(long)]
    pub tls_cert: Option<PathBuf>,

    /// TLS private key file.
    #[arg(long)]
    pub tls_key: Option<PathBuf>,

    /// Gerrit host's username.
    #[arg(long)]
    pub gerrit_user: Option<String>,

    /// Gerrit host.
    #[arg(long)]
    pub gerrit_host: Option<String>,

    /// Build bot status backend URL.
    #[arg(long)]
    pub buildbot_backend: Option<String>,

    /// Hostname to map to the buildbot backend.
    #[arg(long)]
    pub buildbot_host: Option<String>,
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(self, config: &mut SiteConfig) {
        if let Some(http) = self.http {
            config.listener.http_address = normalize_listen_address(&http);
        }
        if let Some(https) = self.https {
            config.listener.https_address = non_empty(https).map(|a| normalize_listen_address(&a));
        }
        if let Some(root) = self.root {
            config.site.root = root;
        }
        if let Some(script) = self.gitweb_script {
            config.gitweb.script = non_empty(script).map(PathBuf::from);
        }
        if let Some(files) = self.gitweb_files {
            config.gitweb.static_files = files;
        }
        if let Some(dir) = self.log_dir {
            config.logging.dir = if dir.as_os_str().is_empty() { None } else { Some(dir) };
        }
        if let Some(stdout) = self.log_stdout {
            config.logging.stdout = stdout;
        }

        match (self.tls_cert, self.tls_key) {
            (Some(cert_path), Some(key_path)) => {
                config.listener.tls = Some(TlsConfig { cert_path, key_path });
            }
            (Some(cert_path), None) => {
                if let Some(tls) = config.listener.tls.as_mut() {
                    tls.cert_path = cert_path;
                }
            }
            (None, Some(key_path)) => {
                if let Some(tls) = config.listener.tls.as_mut() {
                    tls.key_path = key_path;
                }
            }
            (None, None) => {}
        }

        if let Some(user) = self.gerrit_user {
            config.gerrit.user = user;
        }
        if let Some(host) = self.gerrit_host {
            config.gerrit.host = non_empty(host);
        }
        if let Some(backend) = self.buildbot_backend {
            config.buildbot.backend = non_empty(backend);
        }
        if let Some(host) = self.buildbot_host {
            config.buildbot.host = non_empty(host);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("site-gateway").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = SiteConfig::default();
        parse(&[
            "--http",
            ":8080",
            "--root",
            "/srv/site",
            "--gerrit-host",
            "review.internal",
            "--log-stdout",
            "false",
        ])
        .apply(&mut config);

        assert_eq!(config.listener.http_address, "0.0.0.0:8080");
        assert_eq!(config.site.root, PathBuf::from("/srv/site"));
        assert_eq!(config.gerrit.host.as_deref(), Some("review.internal"));
        assert!(!config.logging.stdout);
    }

    #[test]
    fn test_blank_gitweb_script_disables() {
        let mut config = SiteConfig::default();
        assert!(config.gitweb.script.is_some());
        parse(&["--gitweb-script", ""]).apply(&mut config);
        assert!(config.gitweb.script.is_none());
    }

    #[test]
    fn test_tls_pair() {
        let mut config = SiteConfig::default();
        parse(&["--https", ":443", "--tls-cert", "c.pem", "--tls-key", "k.pem"]).apply(&mut config);
        assert!(config.https_enabled());
        let tls = config.listener.tls.unwrap();
        assert_eq!(tls.cert_path, PathBuf::from("c.pem"));
        assert_eq!(tls.key_path, PathBuf::from("k.pem"));
    }

    #[test]
    fn test_absent_flags_leave_config_alone() {
        let mut config = SiteConfig::default();
        config.site.canonical_host = "example.org".into();
        parse(&[]).apply(&mut config);
        assert_eq!(config.site.canonical_host, "example.org");
        assert_eq!(config.listener.http_address, "0.0.0.0:31798");
    }
}
