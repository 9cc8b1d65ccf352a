//! Resolved identities and the contract every auth strategy implements.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::role::Role;

/// Where the credential of a request was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenOrigin {
    BearerHeader,
    SessionCookie,
}

/// Identity attached to a request once the auth gate lets it through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub subject: String,
    pub role: Role,
    pub origin: TokenOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("no credentials presented")]
    MissingToken,
    #[error("token is invalid: {0}")]
    InvalidToken(String),
    #[error("token has expired")]
    Expired,
    #[error("subject {0:?} does not exist")]
    UnknownSubject(String),
    #[error("user {0:?} is disabled")]
    Disabled(String),
}

impl AuthFailure {
    /// Short label used in metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            AuthFailure::MissingToken => "missing_token",
            AuthFailure::InvalidToken(_) => "invalid_token",
            AuthFailure::Expired => "expired",
            AuthFailure::UnknownSubject(_) => "unknown_subject",
            AuthFailure::Disabled(_) => "disabled",
        }
    }
}

/// Resolves the identity behind a request.
#[async_trait]
pub trait AuthDelegate: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> Result<AuthContext, AuthFailure>;
}

/// Turns a raw token into an identity. This is the slow path that
/// [`crate::auth::cache::CachingAuth`] decorates.
#[async_trait]
pub trait TokenIntrospector: Send + Sync {
    async fn introspect(&self, token: &str, origin: TokenOrigin) -> Result<AuthContext, AuthFailure>;
}

/// Find the credential in a request: the bearer header wins over the
/// session cookie.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<(String, TokenOrigin)> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some((token.to_string(), TokenOrigin::BearerHeader));
    }

    cookie_value(headers, cookie_name).map(|t| (t, TokenOrigin::SessionCookie))
}

/// Value of a named cookie, if present and non-empty.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
