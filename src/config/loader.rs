//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::SiteConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<SiteConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Load a configuration file. Validation is deferred until command-line
/// overrides have been applied; see [`finalize`].
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Resolve the site root and validate the assembled configuration.
pub fn finalize(mut config: SiteConfig) -> Result<SiteConfig, ConfigError> {
    if config.site.root.as_os_str().is_empty() {
        config.site.root = std::env::current_dir()?;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let config = parse_config(
            r#"
            [site]
            canonical_host = "example.org"

            [gerrit]
            host = "review.example.org"
            "#,
        )
        .unwrap();

        assert_eq!(config.site.canonical_host, "example.org");
        assert_eq!(config.site.secondary_host, "www.camlistore.org");
        assert_eq!(config.gerrit.host.as_deref(), Some("review.example.org"));
        assert_eq!(config.gerrit.port, 8000);
        assert_eq!(config.listener.write_timeout_secs, 1800);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = parse_config("[listener\nhttp_address = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[filter]\nbot_agents = [\"EvilBot\"]").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.filter.bot_agents, vec!["EvilBot".to_string()]);
    }

    #[test]
    fn test_finalize_fills_empty_root() {
        let config = finalize(SiteConfig::default()).unwrap();
        assert!(!config.site.root.as_os_str().is_empty());
    }

    #[test]
    fn test_finalize_rejects_invalid() {
        let mut config = SiteConfig::default();
        config.listener.https_address = Some("0.0.0.0:443".into());
        let err = finalize(config).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref v) if !v.is_empty()));
    }
}
