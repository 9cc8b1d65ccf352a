//! Single-page application shell.
//!
//! Browser routes and every unmatched path answer with the same document so
//! client-side routing can take over. Unmatched paths keep their 404.

use std::path::Path;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::http::response::BaseUrl;

/// Placeholder replaced with the base path in a custom `index.html`.
pub const BASE_URL_PLACEHOLDER: &str = "{{BASE_URL}}";

const BUILTIN_SHELL: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Profile Server</title>
<base href="{{BASE_URL}}/">
<script>window.basePath = "{{BASE_URL}}";</script>
<script defer src="{{BASE_URL}}/assets/app.js"></script>
</head>
<body><div id="root"></div></body>
</html>
"#;

#[derive(Clone)]
pub struct SpaShell {
    html: Arc<str>,
}

impl SpaShell {
    /// Load `index.html` from the web root, or fall back to the built-in
    /// document when there is none.
    pub fn load(root_dir: Option<&Path>, base: &BaseUrl) -> Self {
        let template = root_dir
            .map(|dir| dir.join("index.html"))
            .and_then(|path| match std::fs::read_to_string(&path) {
                Ok(html) => Some(html),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Using built-in page shell");
                    None
                }
            })
            .unwrap_or_else(|| BUILTIN_SHELL.to_string());

        Self {
            html: template.replace(BASE_URL_PLACEHOLDER, base.path()).into(),
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn respond(&self, status: StatusCode) -> Response {
        (status, Html(self.html.to_string())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_shell_embeds_base_path() {
        let shell = SpaShell::load(None, &BaseUrl::parse("/pyroscope").unwrap());
        assert!(shell.html().contains(r#"window.basePath = "/pyroscope""#));
        assert!(!shell.html().contains(BASE_URL_PLACEHOLDER));
    }

    #[test]
    fn custom_index_is_preferred() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<p>{{BASE_URL}}/app</p>").unwrap();

        let shell = SpaShell::load(Some(dir.path()), &BaseUrl::parse("/x").unwrap());
        assert_eq!(shell.html(), "<p>/x/app</p>");
    }

    #[test]
    fn respond_keeps_status() {
        let shell = SpaShell::load(None, &BaseUrl::default());
        assert_eq!(shell.respond(StatusCode::NOT_FOUND).status(), StatusCode::NOT_FOUND);
    }
}
