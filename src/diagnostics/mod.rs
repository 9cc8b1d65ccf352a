//! Diagnostics exporter.
//!
//! # Routes
//! ```text
//! diagnostic_secure (auth-gated unless disabled, never drained):
//!     /config                      redacted effective configuration
//!     /build                       package name, version, git sha
//!     /targets                     scrape target health, read on demand
//!     /debug/storage/export/{db}   raw storage dump
//!     /debug/pprof/...             runtime profiles (pprof_enabled)
//!
//! unrestricted:
//!     /metrics  /exported-metrics  /healthz
//! ```

pub mod handlers;
pub mod pprof;
pub mod targets;

use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::ServerConfig;
use crate::routing::{RouteGroup, RouteTableBuilder, RouteTableError};
use crate::services::{Collaborators, ExportedMetrics, QueryEngine, TargetSource};

pub struct Diagnostics {
    config: Arc<ServerConfig>,
    targets: Arc<dyn TargetSource>,
    engine: Arc<dyn QueryEngine>,
    exported_metrics: Option<Arc<dyn ExportedMetrics>>,
    metrics: Option<PrometheusHandle>,
    pprof: Option<pprof::PprofState>,
}

impl Diagnostics {
    pub fn new(
        config: &ServerConfig,
        collaborators: &Collaborators,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let pprof = config.diagnostics.pprof_enabled.then(|| pprof::PprofState {
            profiler: collaborators.profiler.clone(),
        });
        Self {
            config: Arc::new(config.redacted()),
            targets: collaborators.targets.clone(),
            engine: collaborators.engine.clone(),
            exported_metrics: collaborators.exported_metrics.clone(),
            metrics,
            pprof,
        }
    }

    pub fn register(&self, builder: &mut RouteTableBuilder) -> Result<(), RouteTableError> {
        let secure = RouteGroup::DiagnosticSecure;
        let open = RouteGroup::Unrestricted;
        let methods = [Method::GET];

        builder
            .add(
                secure,
                "/config",
                &methods,
                get(handlers::config).with_state(self.config.clone()),
            )?
            .add(secure, "/build", &methods, get(handlers::build))?
            .add(
                secure,
                "/targets",
                &methods,
                get(targets::active_targets).with_state(self.targets.clone()),
            )?
            .add(
                secure,
                "/debug/storage/export/{db}",
                &methods,
                get(handlers::storage_export).with_state(self.engine.clone()),
            )?;

        if let Some(state) = &self.pprof {
            builder
                .add(
                    secure,
                    "/debug/pprof/",
                    &methods,
                    get(pprof::index).with_state(state.clone()),
                )?
                .add(secure, "/debug/pprof/cmdline", &methods, get(pprof::cmdline))?
                .add(
                    secure,
                    "/debug/pprof/{profile}",
                    &methods,
                    get(pprof::profile).with_state(state.clone()),
                )?;
        }

        builder
            .add(
                open,
                "/metrics",
                &methods,
                get(handlers::metrics).with_state(self.metrics.clone()),
            )?
            .add(
                open,
                "/exported-metrics",
                &methods,
                get(handlers::exported_metrics).with_state(self.exported_metrics.clone()),
            )?
            .add(open, "/healthz", &methods, get(handlers::healthz))?;

        Ok(())
    }
}
