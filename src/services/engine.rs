//! Storage/query engine interface backing the local query routes.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::body::Bytes;
use serde::Serialize;
use thiserror::Error;

/// Query operations exposed over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Render,
    RenderDiff,
    Labels,
    LabelValues,
    Export,
    MergeExemplars,
    QueryExemplars,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Render => "render",
            QueryKind::RenderDiff => "render-diff",
            QueryKind::Labels => "labels",
            QueryKind::LabelValues => "label-values",
            QueryKind::Export => "export",
            QueryKind::MergeExemplars => "exemplars-merge",
            QueryKind::QueryExemplars => "exemplars-query",
        }
    }
}

/// Everything a query handler forwards to the engine.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub params: HashMap<String, String>,
    pub body: Bytes,
}

/// Engine output, written to the client as-is.
#[derive(Debug, Clone)]
pub struct QueryOutput {
    pub content_type: String,
    pub body: Bytes,
}

impl QueryOutput {
    pub fn json(value: &impl Serialize) -> Result<Self, EngineError> {
        let body = serde_json::to_vec(value).map_err(|e| EngineError::Internal(e.to_string()))?;
        Ok(Self {
            content_type: "application/json".to_string(),
            body: Bytes::from(body),
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AppInfo {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Internal(String),
}

#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn query(&self, kind: QueryKind, request: QueryRequest) -> Result<QueryOutput, EngineError>;

    async fn list_apps(&self) -> Result<Vec<AppInfo>, EngineError>;

    async fn delete_app(&self, name: &str) -> Result<(), EngineError>;

    /// Raw dump of an internal database, served by the diagnostics routes.
    async fn debug_export(&self, db: &str) -> Result<Bytes, EngineError>;
}
