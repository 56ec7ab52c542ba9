//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the site.
//! All types derive Serde traits for deserialization from config files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration for the site gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    /// Listener configuration (plaintext and TLS addresses, timeouts).
    pub listener: ListenerConfig,

    /// Site identity and content layout.
    pub site: SiteSettings,

    /// Gitweb CGI settings.
    pub gitweb: GitwebConfig,

    /// Bot and URL filtering heuristics.
    pub filter: FilterConfig,

    /// Code-review host (proxy target and repository mirror source).
    pub gerrit: GerritConfig,

    /// Build-status backend.
    pub buildbot: BuildbotConfig,

    /// `/debugz/ip` settings.
    pub diagnostics: DiagnosticsConfig,

    /// Log sinks.
    pub logging: LoggingConfig,
}

impl SiteConfig {
    /// HTTPS is enabled when a TLS listen address is configured.
    pub fn https_enabled(&self) -> bool {
        self.listener.https_address.is_some()
    }

    /// Directory holding the HTML content pages.
    pub fn content_root(&self) -> PathBuf {
        self.site.root.join("content")
    }

    pub fn static_root(&self) -> PathBuf {
        self.site.root.join("static")
    }

    pub fn talks_root(&self) -> PathBuf {
        self.site.root.join("talks")
    }

    pub fn template_dir(&self) -> PathBuf {
        self.site.root.join("tmpl")
    }

    /// Local directory the mirror loop populates and gitweb reads.
    pub fn mirror_dir(&self) -> PathBuf {
        self.site.root.join("latestgits")
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Plaintext bind address (e.g., "0.0.0.0:31798").
    pub http_address: String,

    /// Optional TLS bind address. Enables HTTPS redirects for the review proxy.
    pub https_address: Option<String>,

    /// Certificate and key for the TLS listener.
    pub tls: Option<TlsConfig>,

    /// Upper bound on reading a request body, in seconds.
    pub read_timeout_secs: u64,

    /// Upper bound on a request's total lifetime, in seconds.
    pub write_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            http_address: "0.0.0.0:31798".to_string(),
            https_address: None,
            tls: None,
            read_timeout_secs: 5 * 60,
            write_timeout_secs: 30 * 60,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// Site identity and content layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteSettings {
    /// Website root: parent of `static`, `content`, `talks` and `tmpl`.
    /// Empty means the working directory.
    pub root: PathBuf,

    /// Hostname every response should appear to come from.
    pub canonical_host: String,

    /// Alias hostname redirected to the canonical one.
    pub secondary_host: String,

    /// Issue tracker URL; the numeric issue id is appended.
    pub issue_tracker_url: String,

    /// Repository name used by `/gw/` shortcuts.
    pub gitweb_repo: String,

    /// Documentation host for `/pkg/` and `/cmd/`. Unset disables those routes.
    pub docs_base_url: Option<String>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::new(),
            canonical_host: "camlistore.org".to_string(),
            secondary_host: "www.camlistore.org".to_string(),
            issue_tracker_url: "https://code.google.com/p/camlistore/issues/detail?id=".to_string(),
            gitweb_repo: "camlistore.git".to_string(),
            docs_base_url: None,
        }
    }
}

/// Path of the Debian/Ubuntu gitweb assets before they moved under `static/`.
pub const LEGACY_GITWEB_FILES: &str = "/usr/share/gitweb";

/// Default location of gitweb's static assets.
pub const DEFAULT_GITWEB_FILES: &str = "/usr/share/gitweb/static";

/// Gitweb CGI configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitwebConfig {
    /// Path to gitweb.cgi. `None` disables `/code/`.
    pub script: Option<PathBuf>,

    /// Directory with gitweb's CSS, JS and images.
    pub static_files: PathBuf,

    /// Gitweb config file name, relative to the site root.
    pub config_file: String,
}

impl Default for GitwebConfig {
    fn default() -> Self {
        Self {
            script: Some(PathBuf::from("/usr/lib/cgi-bin/gitweb.cgi")),
            static_files: PathBuf::from(DEFAULT_GITWEB_FILES),
            config_file: "gitweb-camli.conf".to_string(),
        }
    }
}

impl GitwebConfig {
    /// Falls back to the legacy asset directory when the default one is missing.
    pub fn resolve_static_files(&self) -> PathBuf {
        if !self.static_files.is_dir() && self.static_files == Path::new(DEFAULT_GITWEB_FILES) {
            return PathBuf::from(LEGACY_GITWEB_FILES);
        }
        self.static_files.clone()
    }
}

/// Request filtering heuristics.
///
/// The bot list and the corrupted-encoding sequence are observed heuristics,
/// not derived rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// User-agent substrings identifying crawlers.
    pub bot_agents: Vec<String>,

    /// Raw-URL substring guarded against crawler query storms.
    pub protected_path: String,

    /// Sequence rewritten in gitweb URLs.
    pub corrupted_sequence: String,

    /// What `corrupted_sequence` is rewritten to.
    pub replacement: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            bot_agents: ["Baidu", "bingbot", "Ezooms", "Googlebot"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            protected_path: "/code/".to_string(),
            corrupted_sequence: "%3B".to_string(),
            replacement: ";".to_string(),
        }
    }
}

/// Code-review host configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GerritConfig {
    /// Review host. `None` disables `/r/` and the mirror loop.
    pub host: Option<String>,

    /// Review web port on `host`.
    pub port: u16,

    /// SSH user for the mirror.
    pub user: String,

    /// Remote directory holding the git repositories.
    pub remote_path: String,

    /// Delay between mirror runs in seconds.
    pub sync_interval_secs: u64,

    /// Sync program.
    pub rsync_program: String,
}

impl Default for GerritConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 8000,
            user: "ubuntu".to_string(),
            remote_path: "gerrit/git/".to_string(),
            sync_interval_secs: 10,
            rsync_program: "rsync".to_string(),
        }
    }
}

impl GerritConfig {
    /// Base URL of the review web UI.
    pub fn web_url(&self) -> Option<String> {
        self.host
            .as_ref()
            .map(|host| format!("http://{}:{}/", host, self.port))
    }
}

/// Build-status backend configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildbotConfig {
    /// Backend URL requests are proxied to.
    pub backend: Option<String>,

    /// Hostname mapped to `backend`.
    pub host: Option<String>,
}

impl BuildbotConfig {
    /// Both halves must be set for the route to exist.
    pub fn route(&self) -> Option<(&str, &str)> {
        match (self.host.as_deref(), self.backend.as_deref()) {
            (Some(host), Some(backend)) if !host.is_empty() && !backend.is_empty() => {
                Some((host, backend))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Interface whose IPv4 address `/debugz/ip` reports.
    pub interface: String,

    pub ip_program: String,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            interface: "eth0".to_string(),
            ip_program: "ip".to_string(),
        }
    }
}

/// Log sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for hourly log files. `None` disables file logging.
    pub dir: Option<PathBuf>,

    /// Also write to stdout.
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            stdout: true,
        }
    }
}
