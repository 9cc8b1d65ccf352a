//! Build, config, health, metrics and storage-export handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

use crate::config::ServerConfig;
use crate::services::{EngineError, ExportedMetrics, QueryEngine};

const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub git_sha: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            git_sha: option_env!("GIT_SHA").unwrap_or(""),
        }
    }
}

pub async fn build() -> Json<BuildInfo> {
    Json(BuildInfo::current())
}

/// State holds the already redacted configuration.
pub async fn config(State(config): State<Arc<ServerConfig>>) -> Json<ServerConfig> {
    Json(config.as_ref().clone())
}

pub async fn healthz() -> &'static str {
    "server is ready"
}

pub async fn metrics(State(handle): State<Option<PrometheusHandle>>) -> Response {
    let body = handle.map(|h| h.render()).unwrap_or_default();
    ([(header::CONTENT_TYPE, PROMETHEUS_TEXT)], body).into_response()
}

pub async fn exported_metrics(
    State(registry): State<Option<Arc<dyn ExportedMetrics>>>,
) -> Response {
    let body = registry.map(|r| r.render()).unwrap_or_default();
    ([(header::CONTENT_TYPE, PROMETHEUS_TEXT)], body).into_response()
}

pub async fn storage_export(
    State(engine): State<Arc<dyn QueryEngine>>,
    Path(db): Path<String>,
) -> Result<Response, EngineError> {
    let dump = engine.debug_export(&db).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], dump).into_response())
}
