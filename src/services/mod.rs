//! External collaborators.
//!
//! The control plane never owns storage, ingestion, scraping or user
//! persistence. It reaches them through the narrow traits below, handed to
//! [`crate::http::HttpServer::new`] and split from there so each component
//! only holds the collaborators it calls.

pub mod engine;
pub mod ingest;
pub mod noop;
pub mod targets;
pub mod users;

use std::sync::Arc;

pub use engine::{AppInfo, EngineError, QueryEngine, QueryKind, QueryOutput, QueryRequest};
pub use ingest::{IngestError, IngestInput, Ingester};
pub use targets::{ExportedMetrics, RuntimeProfiler, TargetHealth, TargetHealthSnapshot, TargetSource};
pub use users::{ExternalIdentity, InMemoryUserStore, User, UserStore, UserStoreError};

/// Collaborators required to construct the server.
#[derive(Clone)]
pub struct Collaborators {
    pub engine: Arc<dyn QueryEngine>,
    pub ingester: Arc<dyn Ingester>,
    pub targets: Arc<dyn TargetSource>,
    pub users: Arc<dyn UserStore>,
    pub exported_metrics: Option<Arc<dyn ExportedMetrics>>,
    pub profiler: Option<Arc<dyn RuntimeProfiler>>,
}

impl Collaborators {
    /// Noop storage, ingestion and targets with the given user store.
    pub fn standalone(users: Arc<dyn UserStore>) -> Self {
        Self {
            engine: Arc::new(noop::NoopEngine),
            ingester: Arc::new(noop::NoopIngester),
            targets: Arc::new(noop::NoopTargets),
            users,
            exported_metrics: None,
            profiler: None,
        }
    }
}
