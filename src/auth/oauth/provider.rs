//! OAuth2 authorization-code client shared by all supported vendors.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::header;
use serde::Deserialize;
use url::Url;

use super::{IdentityProvider, OAuthError};
use crate::config::{OAuthProviderConfig, ProviderKind};
use crate::services::users::ExternalIdentity;

struct Defaults {
    auth_url: &'static str,
    token_url: &'static str,
    api_url: &'static str,
    scopes: &'static [&'static str],
    /// Profile field holding the login name.
    login_field: &'static str,
}

fn defaults(kind: ProviderKind) -> Defaults {
    match kind {
        ProviderKind::Google => Defaults {
            auth_url: "https://accounts.google.com/o/oauth2/auth",
            token_url: "https://oauth2.googleapis.com/token",
            api_url: "https://www.googleapis.com/oauth2/v2/userinfo",
            scopes: &["https://www.googleapis.com/auth/userinfo.email"],
            login_field: "email",
        },
        ProviderKind::Github => Defaults {
            auth_url: "https://github.com/login/oauth/authorize",
            token_url: "https://github.com/login/oauth/access_token",
            api_url: "https://api.github.com/user",
            scopes: &["read:user", "user:email"],
            login_field: "login",
        },
        ProviderKind::Gitlab => Defaults {
            auth_url: "https://gitlab.com/oauth/authorize",
            token_url: "https://gitlab.com/oauth/token",
            api_url: "https://gitlab.com/api/v4/user",
            scopes: &["read_user"],
            login_field: "username",
        },
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub struct OAuthProvider {
    kind: ProviderKind,
    client_id: String,
    client_secret: String,
    auth_url: Url,
    token_url: Url,
    api_url: Url,
    scopes: Vec<String>,
    redirect_url: Option<String>,
    login_field: &'static str,
    client: reqwest::Client,
}

impl OAuthProvider {
    /// Build a provider from its config section. Empty endpoint fields fall
    /// back to the vendor's public endpoints.
    pub fn from_config(
        kind: ProviderKind,
        config: &OAuthProviderConfig,
        timeout: Duration,
    ) -> Result<Self, OAuthError> {
        let defaults = defaults(kind);
        let endpoint = |field: &'static str, value: &str, fallback: &str| {
            let raw = if value.is_empty() { fallback } else { value };
            Url::parse(raw).map_err(|e| OAuthError::InvalidEndpoint {
                provider: kind.as_str(),
                field,
                reason: e.to_string(),
            })
        };

        let scopes = if config.scopes.is_empty() {
            defaults.scopes.iter().map(|s| s.to_string()).collect()
        } else {
            config.scopes.clone()
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            kind,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            auth_url: endpoint("auth_url", &config.auth_url, defaults.auth_url)?,
            token_url: endpoint("token_url", &config.token_url, defaults.token_url)?,
            api_url: endpoint("api_url", &config.api_url, defaults.api_url)?,
            scopes,
            redirect_url: Some(config.redirect_url.clone()).filter(|u| !u.is_empty()),
            login_field: defaults.login_field,
            client,
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }
}

#[async_trait]
impl IdentityProvider for OAuthProvider {
    fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    fn login_url(&self, state: &str, redirect_uri: &str) -> String {
        let mut url = self.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", state);
        url.to_string()
    }

    async fn exchange_callback(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ExternalIdentity, OAuthError> {
        let token: TokenResponse = self
            .client
            .post(self.token_url.clone())
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await?
            .json()
            .await?;

        let access_token = match token.access_token {
            Some(t) if !t.is_empty() => t,
            _ => {
                let reason = token
                    .error_description
                    .or(token.error)
                    .unwrap_or_else(|| "no access token".to_string());
                return Err(OAuthError::Exchange(reason));
            }
        };

        let profile: serde_json::Value = self
            .client
            .get(self.api_url.clone())
            .bearer_auth(access_token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let login = profile
            .get(self.login_field)
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
            .ok_or(OAuthError::MissingIdentity)?;
        let email = profile
            .get("email")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(ExternalIdentity {
            provider: self.kind.as_str().to_string(),
            login: login.to_string(),
            email,
        })
    }

    fn configured_redirect(&self) -> Option<&str> {
        self.redirect_url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    fn config() -> OAuthProviderConfig {
        OAuthProviderConfig {
            enabled: true,
            client_id: "client".into(),
            client_secret: "secret".into(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_endpoints_use_vendor_defaults() {
        let provider =
            OAuthProvider::from_config(ProviderKind::Gitlab, &config(), Duration::from_secs(5)).unwrap();
        let url = provider.login_url("xyz", "http://localhost:4040/auth/gitlab/callback");

        assert!(url.starts_with("https://gitlab.com/oauth/authorize?"));
        assert!(url.contains("client_id=client"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains("scope=read_user"));
        assert_eq!(provider.redirect_route(), "/auth/gitlab/redirect");
    }

    #[test]
    fn invalid_endpoint_fails_construction() {
        let mut cfg = config();
        cfg.token_url = "not a url".into();
        let err = OAuthProvider::from_config(ProviderKind::Github, &cfg, Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, OAuthError::InvalidEndpoint { field: "token_url", .. }));
    }

    #[tokio::test]
    async fn exchange_reads_login_from_profile() {
        let app = Router::new()
            .route(
                "/token",
                post(|| async { Json(serde_json::json!({"access_token": "tok"})) }),
            )
            .route(
                "/user",
                get(|headers: axum::http::HeaderMap| async move {
                    let authorized = headers
                        .get(header::AUTHORIZATION)
                        .map(|v| v == "Bearer tok")
                        .unwrap_or(false);
                    assert!(authorized);
                    Json(serde_json::json!({"login": "octocat", "email": "o@example.com"}))
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut cfg = config();
        cfg.token_url = format!("http://{addr}/token");
        cfg.api_url = format!("http://{addr}/user");
        let provider =
            OAuthProvider::from_config(ProviderKind::Github, &cfg, Duration::from_secs(5)).unwrap();

        let identity = provider.exchange_callback("code", "http://cb").await.unwrap();
        assert_eq!(identity.provider, "github");
        assert_eq!(identity.login, "octocat");
        assert_eq!(identity.email.as_deref(), Some("o@example.com"));
    }

    #[tokio::test]
    async fn exchange_error_is_reported() {
        let app = Router::new().route(
            "/token",
            post(|| async { Json(serde_json::json!({"error": "bad_verification_code"})) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut cfg = config();
        cfg.token_url = format!("http://{addr}/token");
        let provider =
            OAuthProvider::from_config(ProviderKind::Github, &cfg, Duration::from_secs(5)).unwrap();

        let err = provider.exchange_callback("code", "http://cb").await.unwrap_err();
        assert!(matches!(err, OAuthError::Exchange(reason) if reason == "bad_verification_code"));
    }
}
