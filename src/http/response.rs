//! Response helpers shared by handlers and middleware.
//!
//! # Responsibilities
//! - Resolve the configured base URL once and prefix every generated redirect
//! - Map collaborator errors to status codes
//! - Build the empty-bodied rejections the gates emit

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::services::{EngineError, IngestError};

/// Prefix under which the server is reachable.
///
/// Either empty, a path (`/pyroscope`) or an absolute URL
/// (`https://example.com/pyroscope`). Trailing slashes are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseUrl {
    origin: Option<String>,
    path: String,
}

impl BaseUrl {
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::default());
        }
        if raw.starts_with('/') {
            return Ok(Self {
                origin: None,
                path: raw.trim_end_matches('/').to_string(),
            });
        }

        let url = Url::parse(raw)?;
        if !url.has_host() {
            return Err(url::ParseError::EmptyHost);
        }
        Ok(Self {
            origin: Some(url.origin().ascii_serialization()),
            path: url.path().trim_end_matches('/').to_string(),
        })
    }

    /// True when the base carries scheme and host.
    pub fn is_absolute(&self) -> bool {
        self.origin.is_some()
    }

    /// Path prefix without trailing slash; empty when served from the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Prefix an absolute route.
    pub fn join(&self, route: &str) -> String {
        let mut out = self.origin.clone().unwrap_or_default();
        out.push_str(&self.path);
        if !route.starts_with('/') {
            out.push('/');
        }
        out.push_str(route);
        out
    }
}

/// 307 to `route` under the base URL.
pub fn redirect(base: &BaseUrl, route: &str) -> Response {
    redirect_to(&base.join(route))
}

/// 307 to an already resolved location.
pub fn redirect_to(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// Redirect used whenever a browser must sign in.
pub fn login_redirect(base: &BaseUrl) -> Response {
    redirect(base, "/login")
}

/// Attach a `Set-Cookie` header, skipping values that are not valid header
/// text.
pub fn with_cookie(mut response: Response, cookie: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::BadRequest(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Internal(_) => {
                tracing::error!(error = %self, "Storage engine failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = match &self {
            IngestError::Malformed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IngestError::Internal(_) => {
                tracing::error!(error = %self, "Ingestion failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_prefix_is_applied_to_redirects() {
        let base = BaseUrl::parse("/pyroscope").unwrap();
        assert_eq!(base.join("/login"), "/pyroscope/login");

        let response = login_redirect(&base);
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/pyroscope/login");
    }

    #[test]
    fn empty_base_leaves_routes_alone() {
        let base = BaseUrl::parse("").unwrap();
        assert_eq!(base.path(), "");
        assert_eq!(base.join("/login"), "/login");
    }

    #[test]
    fn absolute_base_keeps_origin() {
        let base = BaseUrl::parse("https://example.com/pyroscope/").unwrap();
        assert!(base.is_absolute());
        assert_eq!(base.path(), "/pyroscope");
        assert_eq!(base.join("/login"), "https://example.com/pyroscope/login");
    }

    #[test]
    fn garbage_base_is_rejected() {
        assert!(BaseUrl::parse("ht!tp://broken").is_err());
        assert!(BaseUrl::parse("pyroscope").is_err());
    }
}
