//! CORS slot, built from the configured policy.
//!
//! A `*` entry allows anything. With credentials on it mirrors the request
//! instead of answering with a literal `*`.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

fn wildcard(entries: &[String]) -> bool {
    entries.iter().any(|e| e == "*")
}

/// `None` when no origin is configured, which leaves the slot empty.
pub fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    if config.allowed_origins.is_empty() {
        return None;
    }

    let credentials = config.allow_credentials;

    let origin = match (wildcard(&config.allowed_origins), credentials) {
        (true, true) => AllowOrigin::mirror_request(),
        (true, false) => AllowOrigin::any(),
        (false, _) => AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        ),
    };
    let methods = match (wildcard(&config.allowed_methods), credentials) {
        (true, true) => AllowMethods::mirror_request(),
        (true, false) => AllowMethods::any(),
        (false, _) => AllowMethods::list(
            config
                .allowed_methods
                .iter()
                .filter_map(|m| Method::from_bytes(m.as_bytes()).ok()),
        ),
    };
    let headers = match (wildcard(&config.allowed_headers), credentials) {
        (true, true) => AllowHeaders::mirror_request(),
        (true, false) => AllowHeaders::any(),
        (false, _) => AllowHeaders::list(
            config
                .allowed_headers
                .iter()
                .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok()),
        ),
    };

    let mut layer = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(credentials);
    if config.max_age_secs > 0 {
        layer = layer.max_age(Duration::from_secs(config.max_age_secs));
    }
    Some(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn no_origins_means_no_layer() {
        assert!(cors_layer(&CorsConfig::default()).is_none());
    }

    #[test]
    fn configured_origins_build_a_layer() {
        let config = CorsConfig {
            allowed_origins: vec!["https://ui.example.com".into()],
            max_age_secs: 600,
            ..Default::default()
        };
        assert!(cors_layer(&config).is_some());
    }

    #[tokio::test]
    async fn wildcards_with_credentials_mirror_the_request() {
        let config = CorsConfig {
            allowed_origins: vec!["*".into()],
            allowed_methods: vec!["*".into()],
            allowed_headers: vec!["*".into()],
            allow_credentials: true,
            ..Default::default()
        };
        let router = Router::new()
            .route("/labels", get(|| async { "ok" }))
            .layer(cors_layer(&config).unwrap());

        let preflight = Request::builder()
            .method("OPTIONS")
            .uri("/labels")
            .header(header::ORIGIN, "https://ui.example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-scope")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(preflight).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://ui.example.com");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "PUT");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "x-scope");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }
}
