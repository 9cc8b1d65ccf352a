//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Derive every component from the validated config and collaborators
//! - Build the route table and wrap each group with its middleware slice
//! - Serve plain or TLS connections through axum-server
//! - On shutdown: drain at once, stop accepting, wait out the grace period,
//!   close what is left and report it

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{Method, StatusCode};
use axum::routing::{get, get_service};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;

use crate::auth::{
    register_auth_routes, AuthDelegate, AuthRoutes, CachingAuth, IdentityProvider, OAuthError,
    OAuthProvider, Role, SessionAuth, SessionTokens, StoreIntrospector,
};
use crate::config::ServerConfig;
use crate::diagnostics::Diagnostics;
use crate::http::middleware::{cors_layer, MiddlewareChain};
use crate::http::response::BaseUrl;
use crate::http::shell::SpaShell;
use crate::lifecycle::{DrainState, ShutdownReport};
use crate::net::load_tls_config;
use crate::query::{register_ingest_route, register_query_routes};
use crate::remote::{self, BackendMode};
use crate::routing::{RouteGroup, RouteTableBuilder, RouteTableError};
use crate::services::Collaborators;

/// Pages answered with the SPA shell.
pub const BROWSER_ROUTES: [&str; 14] = [
    "/",
    "/comparison",
    "/comparison-diff",
    "/tracing",
    "/service-discovery",
    "/adhoc-single",
    "/adhoc-comparison",
    "/adhoc-comparison-diff",
    "/settings",
    "/settings/{page}",
    "/settings/{page}/{subpage}",
    "/exemplars/single",
    "/exemplars/merge",
    "/explore",
];

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TLS setup failed: {0}")]
    Tls(std::io::Error),
    #[error("route table: {0}")]
    Router(#[from] RouteTableError),
    #[error("identity provider: {0}")]
    Provider(#[from] OAuthError),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// HTTP server for the profiling control plane.
pub struct HttpServer {
    router: Router,
    config: Arc<ServerConfig>,
    drain: DrainState,
    backend_mode: Option<BackendMode>,
}

impl HttpServer {
    /// Build the server. `config` is expected to have passed validation;
    /// anything that still cannot be built is returned as an error.
    pub fn new(
        config: ServerConfig,
        collaborators: Collaborators,
        metrics: Option<PrometheusHandle>,
    ) -> Result<Self, ServerError> {
        let base = BaseUrl::parse(&config.base_url)
            .map_err(|e| ServerError::Config(format!("base_url: {e}")))?;
        let default_role: Role = config
            .auth
            .signup_default_role
            .parse()
            .map_err(|e| ServerError::Config(format!("signup_default_role: {e}")))?;

        let drain = DrainState::new();
        let shell = SpaShell::load(config.web.root_dir.as_deref(), &base);
        let auth_required = config.auth.is_required();
        let ingestion_auth = config.auth.ingestion.enabled;

        let sessions = (auth_required || ingestion_auth).then(|| {
            SessionTokens::new(
                config.auth.jwt_secret.as_bytes(),
                Duration::from_secs(
                    config
                        .auth
                        .login_max_lifetime_days
                        .saturating_mul(SECONDS_PER_DAY),
                ),
                config.auth.cookie_name.clone(),
            )
        });

        let mut chain = MiddlewareChain::new(drain.clone(), base.clone(), cors_layer(&config.cors));
        if let (true, Some(tokens)) = (auth_required, &sessions) {
            let session: Arc<dyn AuthDelegate> = Arc::new(SessionAuth::new(tokens.clone()));
            chain = chain
                .with_auth(RouteGroup::Query, session.clone())
                .with_auth(RouteGroup::Browser, session.clone());
            if config.diagnostics.auth_required {
                chain = chain.with_auth(RouteGroup::DiagnosticSecure, session);
            }
        }
        if let (true, Some(tokens)) = (ingestion_auth, &sessions) {
            let introspector = StoreIntrospector::new(tokens.clone(), collaborators.users.clone());
            let caching = CachingAuth::new(
                Arc::new(introspector),
                config.auth.ingestion.cache_size,
                Duration::from_secs(config.auth.ingestion.cache_ttl_secs),
                config.auth.cookie_name.clone(),
            );
            chain = chain.with_auth(RouteGroup::Ingest, Arc::new(caching));
        }
        tracing::info!(
            auth_required,
            ingestion_auth,
            diagnostics_auth = chain.auth_enabled(RouteGroup::DiagnosticSecure),
            "Auth gates configured"
        );

        let provider_timeout = Duration::from_secs(config.timeouts.request_secs);
        let mut providers: Vec<Arc<dyn IdentityProvider>> = Vec::new();
        for (kind, provider_config) in config.auth.enabled_providers() {
            providers.push(Arc::new(OAuthProvider::from_config(
                kind,
                provider_config,
                provider_timeout,
            )?));
        }

        let mut builder = RouteTableBuilder::new();

        register_auth_routes(
            &mut builder,
            &AuthRoutes {
                users: collaborators.users.clone(),
                sessions,
                cookie_name: config.auth.cookie_name.clone(),
                internal_enabled: config.auth.internal.enabled,
                signup_enabled: config.auth.internal.signup_enabled,
                default_role,
                providers,
                shell: shell.clone(),
                base: base.clone(),
            },
        )?;

        register_ingest_route(&mut builder, collaborators.ingester.clone(), ingestion_auth)?;

        let backend = remote::decide(
            &config.remote_read,
            &config.timeouts,
            collaborators.engine.clone(),
        );
        register_query_routes(&mut builder, &backend, auth_required)?;

        for pattern in BROWSER_ROUTES {
            let shell = shell.clone();
            builder.add(
                RouteGroup::Browser,
                pattern,
                &[Method::GET],
                get(move || async move { shell.respond(StatusCode::OK) }),
            )?;
        }

        let assets = match &config.web.root_dir {
            Some(root) => get_service(ServeDir::new(root)),
            None => get(|| async { StatusCode::NOT_FOUND }),
        };
        builder.add(RouteGroup::Asset, "/assets/{*path}", &[Method::GET], assets)?;

        Diagnostics::new(&config, &collaborators, metrics).register(&mut builder)?;

        let fallback_shell = shell;
        builder.fallback(move || async move { fallback_shell.respond(StatusCode::NOT_FOUND) });

        let table = builder.build();
        let router = Self::build_router(&config, table.into_router(&chain));

        Ok(Self {
            router,
            config: Arc::new(config),
            drain,
            backend_mode: backend.mode(),
        })
    }

    /// Apply the layers that cover every route, fallback included.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, router: Router) -> Router {
        router.layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
    }

    /// The assembled router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn drain_state(&self) -> DrainState {
        self.drain.clone()
    }

    /// Handler set bound to the query routes, `None` when they were left out.
    pub fn backend_mode(&self) -> Option<BackendMode> {
        self.backend_mode
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires (or its sender goes away).
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<ShutdownReport, ServerError> {
        let addr = listener.local_addr()?;
        let listener = listener.into_std()?;
        let grace = Duration::from_secs(self.config.lifecycle.shutdown_grace_secs);
        let handle = axum_server::Handle::new();
        let closer = handle.clone();

        let watcher = {
            let handle = handle.clone();
            let drain = self.drain.clone();
            tokio::spawn(async move {
                let _ = shutdown.recv().await;
                let started = Instant::now();
                drain.begin_drain();
                tracing::info!(grace_secs = grace.as_secs(), "Graceful shutdown started");
                handle.graceful_shutdown(Some(grace));
                started
            })
        };

        let app = self.router.into_make_service();
        let served = match &self.config.listener.tls {
            Some(tls) => {
                let rustls = load_tls_config(tls).await.map_err(ServerError::Tls)?;
                tracing::info!(address = %addr, "HTTPS server starting");
                axum_server::tls_rustls::from_tcp_rustls(listener, rustls)
                    .handle(handle)
                    .serve(app)
                    .await
            }
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum_server::from_tcp(listener).handle(handle).serve(app).await
            }
        };

        if let Err(e) = served {
            watcher.abort();
            return Err(ServerError::Io(e));
        }

        let started = watcher.await.map_err(std::io::Error::other)?;
        let report = ShutdownReport::new(started.elapsed(), grace);
        if report.forced {
            closer.shutdown();
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "Grace period exceeded; remaining connections were closed"
            );
        } else {
            tracing::info!(elapsed_ms = report.elapsed.as_millis() as u64, "HTTP server stopped");
        }
        Ok(report)
    }
}
