//! Backend selection for the query routes, made once at construction.

use std::sync::Arc;

use crate::config::{RemoteReadConfig, TimeoutConfig};
use crate::remote::proxy::RemoteReadProxy;
use crate::services::QueryEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Local,
    Remote,
}

/// Handler set bound to every query route.
#[derive(Clone)]
pub enum QueryBackend {
    Local(Arc<dyn QueryEngine>),
    Remote(Arc<RemoteReadProxy>),
    /// Remote read was requested but the proxy could not be built. The query
    /// routes are left out of the table.
    Unavailable,
}

impl QueryBackend {
    /// `None` when the routes are omitted.
    pub fn mode(&self) -> Option<BackendMode> {
        match self {
            QueryBackend::Local(_) => Some(BackendMode::Local),
            QueryBackend::Remote(_) => Some(BackendMode::Remote),
            QueryBackend::Unavailable => None,
        }
    }
}

pub fn decide(
    config: &RemoteReadConfig,
    timeouts: &TimeoutConfig,
    engine: Arc<dyn QueryEngine>,
) -> QueryBackend {
    if !config.enabled {
        return QueryBackend::Local(engine);
    }

    match RemoteReadProxy::new(config, timeouts) {
        Ok(proxy) => {
            tracing::info!(upstream = %proxy.target(), "Query routes proxied to remote-read backend");
            QueryBackend::Remote(Arc::new(proxy))
        }
        Err(e) => {
            tracing::error!(
                address = %config.address,
                error = %e,
                "Failed to initialize remote read handler; query routes are disabled"
            );
            QueryBackend::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::noop::NoopEngine;

    fn engine() -> Arc<dyn QueryEngine> {
        Arc::new(NoopEngine)
    }

    #[test]
    fn disabled_remote_read_is_local() {
        let backend = decide(&RemoteReadConfig::default(), &TimeoutConfig::default(), engine());
        assert_eq!(backend.mode(), Some(BackendMode::Local));
    }

    #[test]
    fn usable_endpoint_is_remote() {
        let config = RemoteReadConfig {
            enabled: true,
            address: "http://127.0.0.1:4100".into(),
            auth_token: Some("token".into()),
        };
        let backend = decide(&config, &TimeoutConfig::default(), engine());
        assert_eq!(backend.mode(), Some(BackendMode::Remote));
    }

    #[test]
    fn broken_endpoint_never_falls_back_to_local() {
        let config = RemoteReadConfig {
            enabled: true,
            address: "not a url".into(),
            auth_token: None,
        };
        let backend = decide(&config, &TimeoutConfig::default(), engine());
        assert_eq!(backend.mode(), None);
    }
}
