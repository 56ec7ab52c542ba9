//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate listen addresses and backend URLs
//! - Check that HTTPS has its certificate material
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SiteConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::SiteConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid listen address {field}: {value:?}")]
    ListenAddress { field: &'static str, value: String },

    #[error("HTTPS listener requires both tls.cert_path and tls.key_path")]
    MissingTls,

    #[error("site.canonical_host must not be empty")]
    EmptyCanonicalHost,

    #[error("invalid URL for {field}: {value:?}")]
    BackendUrl { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
}

/// Normalize Go-style `:port` addresses to an explicit wildcard host.
pub fn normalize_listen_address(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if normalize_listen_address(value).parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::ListenAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_url(
    field: &'static str,
    value: &str,
    schemes: &[&str],
    errors: &mut Vec<ValidationError>,
) {
    let ok = Url::parse(value)
        .map(|u| schemes.contains(&u.scheme()) && u.host_str().is_some())
        .unwrap_or(false);
    if !ok {
        errors.push(ValidationError::BackendUrl {
            field,
            value: value.to_string(),
        });
    }
}

/// Validate a fully assembled configuration.
pub fn validate_config(config: &SiteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address("listener.http_address", &config.listener.http_address, &mut errors);

    if let Some(https) = &config.listener.https_address {
        check_address("listener.https_address", https, &mut errors);
        if config.listener.tls.is_none() {
            errors.push(ValidationError::MissingTls);
        }
    }

    if config.site.canonical_host.trim().is_empty() {
        errors.push(ValidationError::EmptyCanonicalHost);
    }

    if let Some((_, backend)) = config.buildbot.route() {
        // The proxy client speaks plain HTTP only.
        check_url("buildbot.backend", backend, &["http"], &mut errors);
    }

    if let Some(docs) = &config.site.docs_base_url {
        check_url("site.docs_base_url", docs, &["http", "https"], &mut errors);
    }

    if config.listener.read_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "listener.read_timeout_secs",
        });
    }
    if config.listener.write_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDuration {
            field: "listener.write_timeout_secs",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
