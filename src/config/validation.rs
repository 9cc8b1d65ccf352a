//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, cache sizing > 0, session lifetime)
//! - Check that TLS files exist before the socket is bound
//! - Check that enabled features carry the settings they need
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - The remote-read address is not checked here: an unusable endpoint
//!   drops the query routes at construction time instead

use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::path::Path;

use axum::http::{HeaderName, Method};
use thiserror::Error;

use crate::auth::role::Role;
use crate::config::schema::{ProviderKind, ServerConfig};
use crate::http::response::BaseUrl;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),
    #[error("base_url {0:?} is invalid: {1}")]
    InvalidBaseUrl(String, String),
    #[error("auth.signup_default_role {0:?} is not a known role")]
    InvalidDefaultRole(String),
    #[error("auth.jwt_secret must be set when authentication is enabled")]
    MissingJwtSecret,
    #[error("auth.{provider} is enabled but {field} is empty")]
    ProviderMisconfigured {
        provider: ProviderKind,
        field: &'static str,
    },
    #[error("listener.tls requires both cert_path and key_path")]
    IncompleteTls,
    #[error("listener.tls.{0} {1:?} does not exist")]
    MissingTlsFile(&'static str, String),
    #[error("cors.{0}: wildcard cannot be combined with allow_credentials")]
    CorsWildcardWithCredentials(&'static str),
    #[error("cors.allowed_methods entry {0:?} is not an HTTP method")]
    InvalidCorsMethod(String),
    #[error("cors.allowed_headers entry {0:?} is not a header name")]
    InvalidCorsHeader(String),
    #[error("auth.ingestion.{0} must be greater than zero")]
    InvalidIngestionCache(&'static str),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("auth.login_max_lifetime_days must be between 1 and 3650, got {0}")]
    SessionLifetimeOutOfRange(u64),
}

/// Accepted session lifetimes, in days.
pub const SESSION_LIFETIME_DAYS: RangeInclusive<u64> = 1..=3650;

/// Check every semantic rule and collect all violations.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::IncompleteTls);
        } else {
            for (field, path) in [("cert_path", &tls.cert_path), ("key_path", &tls.key_path)] {
                if !Path::new(path).is_file() {
                    errors.push(ValidationError::MissingTlsFile(field, path.clone()));
                }
            }
        }
    }

    if let Err(e) = BaseUrl::parse(&config.base_url) {
        errors.push(ValidationError::InvalidBaseUrl(
            config.base_url.clone(),
            e.to_string(),
        ));
    }

    validate_auth(config, &mut errors);
    validate_cors(config, &mut errors);

    for (name, value) in [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.idle_secs", config.timeouts.idle_secs),
        ("lifecycle.shutdown_grace_secs", config.lifecycle.shutdown_grace_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration(name));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_auth(config: &ServerConfig, errors: &mut Vec<ValidationError>) {
    let auth = &config.auth;

    if auth.signup_default_role.parse::<Role>().is_err() {
        errors.push(ValidationError::InvalidDefaultRole(
            auth.signup_default_role.clone(),
        ));
    }

    if (auth.is_required() || auth.ingestion.enabled) && auth.jwt_secret.is_empty() {
        errors.push(ValidationError::MissingJwtSecret);
    }

    for (provider, settings) in auth.enabled_providers() {
        if settings.client_id.is_empty() {
            errors.push(ValidationError::ProviderMisconfigured {
                provider,
                field: "client_id",
            });
        }
        if settings.client_secret.is_empty() {
            errors.push(ValidationError::ProviderMisconfigured {
                provider,
                field: "client_secret",
            });
        }
    }

    if auth.ingestion.enabled {
        if auth.ingestion.cache_size == 0 {
            errors.push(ValidationError::InvalidIngestionCache("cache_size"));
        }
        if auth.ingestion.cache_ttl_secs == 0 {
            errors.push(ValidationError::InvalidIngestionCache("cache_ttl_secs"));
        }
    }

    if !SESSION_LIFETIME_DAYS.contains(&auth.login_max_lifetime_days) {
        errors.push(ValidationError::SessionLifetimeOutOfRange(
            auth.login_max_lifetime_days,
        ));
    }
}

fn validate_cors(config: &ServerConfig, errors: &mut Vec<ValidationError>) {
    let cors = &config.cors;
    if cors.allowed_origins.is_empty() {
        return;
    }

    if cors.allow_credentials {
        for (field, entries) in [
            ("allowed_origins", &cors.allowed_origins),
            ("allowed_methods", &cors.allowed_methods),
            ("allowed_headers", &cors.allowed_headers),
        ] {
            if entries.iter().any(|e| e == "*") {
                errors.push(ValidationError::CorsWildcardWithCredentials(field));
            }
        }
    }

    for method in &cors.allowed_methods {
        if method != "*" && method.parse::<Method>().is_err() {
            errors.push(ValidationError::InvalidCorsMethod(method.clone()));
        }
    }

    for header in &cors.allowed_headers {
        if header != "*" && header.parse::<HeaderName>().is_err() {
            errors.push(ValidationError::InvalidCorsHeader(header.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TlsConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.auth.signup_default_role = "Overlord".into();
        config.auth.internal.enabled = true;
        config.listener.tls = Some(TlsConfig {
            cert_path: "cert.pem".into(),
            key_path: String::new(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidBindAddress("not-an-address".into())));
        assert!(errors.contains(&ValidationError::InvalidDefaultRole("Overlord".into())));
        assert!(errors.contains(&ValidationError::MissingJwtSecret));
        assert!(errors.contains(&ValidationError::IncompleteTls));
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let mut config = ServerConfig::default();
        config.base_url = "ht!tp://broken".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidBaseUrl(..)));
    }

    #[test]
    fn enabled_provider_needs_credentials() {
        let mut config = ServerConfig::default();
        config.auth.jwt_secret = "secret".into();
        config.auth.gitlab.enabled = true;
        config.auth.gitlab.client_id = "id".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ProviderMisconfigured {
                provider: ProviderKind::Gitlab,
                field: "client_secret",
            }]
        );
    }

    #[test]
    fn cors_wildcard_with_credentials_is_rejected() {
        let mut config = ServerConfig::default();
        config.cors.allowed_origins = vec!["*".into()];
        config.cors.allow_credentials = true;
        config.cors.allowed_methods.push("NOT A METHOD".into());

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::CorsWildcardWithCredentials("allowed_origins")));
        assert!(errors.contains(&ValidationError::InvalidCorsMethod("NOT A METHOD".into())));
    }

    #[test]
    fn wildcard_headers_with_credentials_are_rejected() {
        let mut config = ServerConfig::default();
        config.cors.allowed_origins = vec!["https://ui.example.com".into()];
        config.cors.allowed_headers = vec!["*".into()];
        config.cors.allowed_methods = vec!["GET".into(), "*".into()];
        config.cors.allow_credentials = true;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::CorsWildcardWithCredentials("allowed_methods"),
                ValidationError::CorsWildcardWithCredentials("allowed_headers"),
            ]
        );

        config.cors.allow_credentials = false;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn session_lifetime_is_bounded() {
        let mut config = ServerConfig::default();
        config.auth.login_max_lifetime_days = 0;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::SessionLifetimeOutOfRange(0)]
        );

        config.auth.login_max_lifetime_days = u64::MAX;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::SessionLifetimeOutOfRange(u64::MAX)]
        );

        config.auth.login_max_lifetime_days = 3650;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn tls_files_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        std::fs::write(&cert, "not checked here").unwrap();
        let key = dir.path().join("key.pem");

        let mut config = ServerConfig::default();
        config.listener.tls = Some(TlsConfig {
            cert_path: cert.display().to_string(),
            key_path: key.display().to_string(),
        });
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::MissingTlsFile("key_path", key.display().to_string())]
        );

        std::fs::write(&key, "not checked here").unwrap();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn remote_read_address_is_not_a_startup_error() {
        let mut config = ServerConfig::default();
        config.remote_read.enabled = true;
        config.remote_read.address = "::not a url::".into();
        assert!(validate_config(&config).is_ok());
    }
}
