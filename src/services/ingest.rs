//! Ingestion pipeline interface behind `POST /ingest`.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct IngestInput {
    pub params: HashMap<String, String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("malformed profile: {0}")]
    Malformed(String),
    #[error("ingestion failed: {0}")]
    Internal(String),
}

#[async_trait]
pub trait Ingester: Send + Sync {
    async fn ingest(&self, input: IngestInput) -> Result<(), IngestError>;
}
