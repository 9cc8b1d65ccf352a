//! `/debug/pprof/*`: runtime profiles from an optional collaborator.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use crate::services::RuntimeProfiler;

#[derive(Clone, Default)]
pub struct PprofState {
    pub profiler: Option<Arc<dyn RuntimeProfiler>>,
}

pub async fn index(State(state): State<PprofState>) -> Html<String> {
    let names = state
        .profiler
        .as_ref()
        .map(|p| p.available())
        .unwrap_or_default();

    let mut html = String::from("<html><head><title>/debug/pprof/</title></head><body>\n");
    html.push_str("<a href=\"cmdline\">cmdline</a><br>\n");
    for name in names {
        html.push_str(&format!("<a href=\"{name}\">{name}</a><br>\n"));
    }
    html.push_str("</body></html>\n");
    Html(html)
}

pub async fn cmdline() -> String {
    std::env::args().collect::<Vec<_>>().join("\0")
}

pub async fn profile(State(state): State<PprofState>, Path(name): Path<String>) -> Response {
    let Some(profiler) = state.profiler.as_ref() else {
        return (StatusCode::NOT_FOUND, "profiling is not available").into_response();
    };
    match profiler.collect(&name) {
        Some(bytes) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, format!("unknown profile {name:?}")).into_response(),
    }
}
