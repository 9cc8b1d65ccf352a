//! Collaborators that accept everything and store nothing. Used when the
//! control plane runs without a storage engine attached.

use async_trait::async_trait;
use axum::body::Bytes;

use crate::services::engine::{AppInfo, EngineError, QueryEngine, QueryKind, QueryOutput, QueryRequest};
use crate::services::ingest::{IngestError, IngestInput, Ingester};
use crate::services::targets::{TargetHealthSnapshot, TargetSource};

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEngine;

#[async_trait]
impl QueryEngine for NoopEngine {
    async fn query(&self, kind: QueryKind, _request: QueryRequest) -> Result<QueryOutput, EngineError> {
        match kind {
            QueryKind::Labels | QueryKind::LabelValues => QueryOutput::json(&Vec::<String>::new()),
            _ => QueryOutput::json(&serde_json::json!({})),
        }
    }

    async fn list_apps(&self) -> Result<Vec<AppInfo>, EngineError> {
        Ok(Vec::new())
    }

    async fn delete_app(&self, _name: &str) -> Result<(), EngineError> {
        Ok(())
    }

    async fn debug_export(&self, db: &str) -> Result<Bytes, EngineError> {
        Err(EngineError::NotFound(db.to_string()))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopIngester;

#[async_trait]
impl Ingester for NoopIngester {
    async fn ingest(&self, input: IngestInput) -> Result<(), IngestError> {
        tracing::trace!(bytes = input.body.len(), "Discarding profile");
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTargets;

impl TargetSource for NoopTargets {
    fn active_targets(&self) -> Vec<TargetHealthSnapshot> {
        Vec::new()
    }
}
