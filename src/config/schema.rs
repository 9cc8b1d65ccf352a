//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const REDACTED: &str = "<redacted>";

/// Root configuration for the profiling server control plane.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Prefix under which the server is reachable, e.g. `/pyroscope` or
    /// `https://example.com/pyroscope`. Empty means served from the root.
    pub base_url: String,

    /// Cross-origin resource sharing policy.
    pub cors: CorsConfig,

    /// Authentication settings.
    pub auth: AuthConfig,

    /// Remote-read (query proxy) settings.
    pub remote_read: RemoteReadConfig,

    /// Diagnostic endpoint settings.
    pub diagnostics: DiagnosticsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Process lifecycle settings.
    pub lifecycle: LifecycleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Web UI settings.
    pub web: WebConfig,
}

impl ServerConfig {
    /// Copy of the configuration with every secret replaced, suitable for
    /// exposing through diagnostics.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        redact(&mut config.auth.jwt_secret);
        if let Some(admin) = config.auth.internal.admin.as_mut() {
            redact(&mut admin.password);
        }
        for provider in [
            &mut config.auth.google,
            &mut config.auth.github,
            &mut config.auth.gitlab,
        ] {
            redact(&mut provider.client_secret);
        }
        if let Some(token) = config.remote_read.auth_token.as_mut() {
            redact(token);
        }
        config
    }
}

fn redact(secret: &mut String) {
    if !secret.is_empty() {
        *secret = REDACTED.to_string();
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:4040").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4040".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// CORS policy. An empty origin list disables CORS handling entirely.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: vec!["GET".into(), "POST".into(), "HEAD".into(), "OPTIONS".into()],
            allowed_headers: vec!["Content-Type".into(), "Authorization".into()],
            allow_credentials: false,
            max_age_secs: 0,
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens.
    pub jwt_secret: String,

    /// Session token lifetime in days.
    pub login_max_lifetime_days: u64,

    /// Name of the cookie carrying the session token.
    pub cookie_name: String,

    /// Role given to users created through signup or an OAuth provider.
    pub signup_default_role: String,

    /// Username/password authentication.
    pub internal: InternalAuthConfig,

    /// Authentication of the ingestion endpoint.
    pub ingestion: IngestionAuthConfig,

    pub google: OAuthProviderConfig,
    pub github: OAuthProviderConfig,
    pub gitlab: OAuthProviderConfig,
}

impl AuthConfig {
    /// True when browser and API routes must resolve an identity.
    pub fn is_required(&self) -> bool {
        self.internal.enabled || self.enabled_providers().next().is_some()
    }

    /// Every provider section paired with its kind.
    pub fn providers(&self) -> impl Iterator<Item = (ProviderKind, &OAuthProviderConfig)> {
        [
            (ProviderKind::Google, &self.google),
            (ProviderKind::Github, &self.github),
            (ProviderKind::Gitlab, &self.gitlab),
        ]
        .into_iter()
    }

    pub fn enabled_providers(&self) -> impl Iterator<Item = (ProviderKind, &OAuthProviderConfig)> {
        self.providers().filter(|(_, p)| p.enabled)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            login_max_lifetime_days: 30,
            cookie_name: "pyroscopeJWT".to_string(),
            signup_default_role: "ReadOnly".to_string(),
            internal: InternalAuthConfig::default(),
            ingestion: IngestionAuthConfig::default(),
            google: OAuthProviderConfig::default(),
            github: OAuthProviderConfig::default(),
            gitlab: OAuthProviderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct InternalAuthConfig {
    pub enabled: bool,
    pub signup_enabled: bool,
    /// Admin user created at startup when set.
    pub admin: Option<AdminUserConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AdminUserConfig {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestionAuthConfig {
    /// Require a token with at least the agent role on `/ingest`.
    pub enabled: bool,

    /// Maximum number of cached token resolutions.
    pub cache_size: u64,

    /// How long a cached resolution stays valid, in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for IngestionAuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cache_size: 1024,
            cache_ttl_secs: 60,
        }
    }
}

/// Supported external identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Google,
    Github,
    Gitlab,
}

impl ProviderKind {
    /// Path segment used in `/auth/{provider}/...` routes.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Github => "github",
            ProviderKind::Gitlab => "gitlab",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth client settings for one provider. Endpoint URLs default to the
/// provider's public endpoints when left empty.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OAuthProviderConfig {
    pub enabled: bool,
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    /// Absolute callback URL registered with the provider. Derived from the
    /// request host and base URL when empty.
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

/// Remote-read configuration: when enabled, query routes are forwarded to
/// `address` instead of the local storage engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RemoteReadConfig {
    pub enabled: bool,
    pub address: String,
    /// Bearer token attached to forwarded requests.
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Require an identity on `/config`, `/build`, `/targets` and `/debug/*`.
    pub auth_required: bool,

    /// Register the `/debug/pprof/*` endpoints.
    pub pprof_enabled: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            auth_required: true,
            pprof_enabled: true,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout towards the remote-read backend.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Idle pooled connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 15,
            idle_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long in-flight requests may run after shutdown begins before
    /// their connections are closed.
    pub shutdown_grace_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            shutdown_grace_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WebConfig {
    /// Directory holding `index.html` and `assets/`.
    pub root_dir: Option<PathBuf>,
}
