//! Remote-read proxy.
//!
//! Forwards the whole request to the configured backend and streams the
//! response back as received, status included.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use url::Url;

use crate::config::{RemoteReadConfig, TimeoutConfig};
use crate::observability::metrics;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyBuildError {
    #[error("remote-read address {0:?} is not a valid URL: {1}")]
    InvalidAddress(String, String),
    #[error("remote-read scheme {0:?} is not supported, use http")]
    UnsupportedScheme(String),
    #[error("remote-read auth token is not a valid header value")]
    InvalidToken,
}

/// Headers that describe one connection and are not forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub struct RemoteReadProxy {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    base_path: String,
    auth: Option<HeaderValue>,
}

impl RemoteReadProxy {
    pub fn new(config: &RemoteReadConfig, timeouts: &TimeoutConfig) -> Result<Self, ProxyBuildError> {
        let url = Url::parse(&config.address)
            .map_err(|e| ProxyBuildError::InvalidAddress(config.address.clone(), e.to_string()))?;
        if url.scheme() != "http" {
            return Err(ProxyBuildError::UnsupportedScheme(url.scheme().to_string()));
        }
        let host = url.host_str().ok_or_else(|| {
            ProxyBuildError::InvalidAddress(config.address.clone(), "missing host".to_string())
        })?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = Authority::from_str(&authority)
            .map_err(|e| ProxyBuildError::InvalidAddress(config.address.clone(), e.to_string()))?;

        let auth = match config.auth_token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => Some(
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| ProxyBuildError::InvalidToken)?,
            ),
            None => None,
        };

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .build(connector);

        Ok(Self {
            client,
            authority,
            base_path: url.path().trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn target(&self) -> String {
        format!("http://{}{}", self.authority, self.base_path)
    }

    fn upstream_uri(&self, uri: &Uri) -> Option<Uri> {
        let path_and_query = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        let path_and_query =
            PathAndQuery::from_str(&format!("{}{}", self.base_path, path_and_query)).ok()?;
        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .ok()
    }

    pub async fn forward(&self, request: Request) -> Response {
        let (mut parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();

        let Some(uri) = self.upstream_uri(&parts.uri) else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        parts.uri = uri;
        parts.headers.remove(header::HOST);
        for name in HOP_BY_HOP {
            parts.headers.remove(HeaderName::from_static(name));
        }
        if let Some(auth) = &self.auth {
            parts.headers.insert(header::AUTHORIZATION, auth.clone());
        }

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => {
                let status = response.status();
                tracing::debug!(path = %path, status = %status, "Proxied remote read");
                metrics::record_remote_read(status.as_u16());
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(
                    path = %path,
                    upstream = %self.target(),
                    error = %e,
                    "Remote-read backend unreachable"
                );
                metrics::record_remote_read(StatusCode::BAD_GATEWAY.as_u16());
                (StatusCode::BAD_GATEWAY, "remote-read backend unreachable").into_response()
            }
        }
    }
}

pub async fn proxy_handler(State(proxy): State<Arc<RemoteReadProxy>>, request: Request) -> Response {
    proxy.forward(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(address: &str) -> RemoteReadConfig {
        RemoteReadConfig {
            enabled: true,
            address: address.to_string(),
            auth_token: None,
        }
    }

    #[test]
    fn upstream_uri_keeps_path_and_query() {
        let proxy =
            RemoteReadProxy::new(&config("http://10.0.0.1:4100/prefix/"), &TimeoutConfig::default())
                .unwrap();
        let uri: Uri = "/render?query=cpu&format=json".parse().unwrap();
        assert_eq!(
            proxy.upstream_uri(&uri).unwrap().to_string(),
            "http://10.0.0.1:4100/prefix/render?query=cpu&format=json"
        );
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        let err = RemoteReadProxy::new(&config("https://remote:4100"), &TimeoutConfig::default())
            .err()
            .unwrap();
        assert_eq!(err, ProxyBuildError::UnsupportedScheme("https".into()));
    }

    #[test]
    fn garbage_address_is_rejected() {
        let err = RemoteReadProxy::new(&config("::not a url::"), &TimeoutConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, ProxyBuildError::InvalidAddress(..)));
    }
}
