//! Query and ingestion routes.
//!
//! Query routes are bound to whatever [`QueryBackend`] was decided at
//! construction: local handlers over the storage engine, or the remote-read
//! proxy for every route at once. Ingestion is always local.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, on, MethodFilter, MethodRouter};
use axum::Json;
use serde::Deserialize;

use crate::auth::role::Role;
use crate::http::middleware::{require_role, RoleGate};
use crate::remote::{proxy_handler, QueryBackend};
use crate::routing::{RouteGroup, RouteTableBuilder, RouteTableError};
use crate::services::{
    EngineError, IngestInput, Ingester, QueryEngine, QueryKind, QueryOutput, QueryRequest,
};

/// Query routes and the operation each one maps to.
pub const QUERY_ROUTES: [(&str, QueryKind); 8] = [
    ("/render", QueryKind::Render),
    ("/render-diff", QueryKind::RenderDiff),
    ("/labels", QueryKind::Labels),
    ("/label-values", QueryKind::LabelValues),
    ("/export", QueryKind::Export),
    ("/merge", QueryKind::MergeExemplars),
    ("/api/exemplars:merge", QueryKind::MergeExemplars),
    ("/api/exemplars:query", QueryKind::QueryExemplars),
];

pub const APPS_ROUTE: &str = "/api/apps";

/// Output formats the render endpoints accept.
pub fn check_format(format: Option<&str>) -> Result<(), EngineError> {
    match format.unwrap_or("") {
        "json" | "pprof" | "collapsed" | "html" | "" => Ok(()),
        other => Err(EngineError::BadRequest(format!("unknown format {other:?}"))),
    }
}

#[derive(Clone)]
struct QueryState {
    engine: Arc<dyn QueryEngine>,
    kind: QueryKind,
}

async fn run_query(
    State(state): State<QueryState>,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response, EngineError> {
    if matches!(state.kind, QueryKind::Render | QueryKind::RenderDiff) {
        check_format(params.get("format").map(String::as_str))?;
    }
    let output = state
        .engine
        .query(state.kind, QueryRequest { params, body })
        .await?;
    Ok(output_response(output))
}

fn output_response(output: QueryOutput) -> Response {
    ([(header::CONTENT_TYPE, output.content_type)], output.body).into_response()
}

async fn list_apps(State(engine): State<Arc<dyn QueryEngine>>) -> Result<Response, EngineError> {
    let apps = engine.list_apps().await?;
    Ok(Json(apps).into_response())
}

#[derive(Debug, Deserialize)]
struct DeleteApp {
    name: String,
}

async fn delete_app(
    State(engine): State<Arc<dyn QueryEngine>>,
    Json(app): Json<DeleteApp>,
) -> Result<StatusCode, EngineError> {
    engine.delete_app(&app.name).await?;
    tracing::info!(app = %app.name, "Application deleted");
    Ok(StatusCode::OK)
}

async fn ingest(
    State(ingester): State<Arc<dyn Ingester>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    match ingester
        .ingest(IngestInput {
            params,
            content_type,
            body,
        })
        .await
    {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    }
}

fn get_or_post() -> MethodFilter {
    MethodFilter::GET.or(MethodFilter::POST)
}

/// Register the query group. Nothing is registered when the backend is
/// unavailable. `admin_enforced` turns on the admin check for app deletion.
pub fn register_query_routes(
    builder: &mut RouteTableBuilder,
    backend: &QueryBackend,
    admin_enforced: bool,
) -> Result<(), RouteTableError> {
    let admin_only = from_fn_with_state(RoleGate::new(Role::Admin, admin_enforced), require_role);
    let read_methods = [Method::GET, Method::POST];

    match backend {
        QueryBackend::Unavailable => {}
        QueryBackend::Local(engine) => {
            for (pattern, kind) in QUERY_ROUTES {
                let state = QueryState {
                    engine: engine.clone(),
                    kind,
                };
                builder.add(
                    RouteGroup::Query,
                    pattern,
                    &read_methods,
                    on(get_or_post(), run_query).with_state(state),
                )?;
            }
            builder
                .add(
                    RouteGroup::Query,
                    APPS_ROUTE,
                    &[Method::GET],
                    get(list_apps).with_state(engine.clone()),
                )?
                .add(
                    RouteGroup::Query,
                    APPS_ROUTE,
                    &[Method::DELETE],
                    delete(delete_app)
                        .route_layer(admin_only)
                        .with_state(engine.clone()),
                )?;
        }
        QueryBackend::Remote(proxy) => {
            for (pattern, _) in QUERY_ROUTES {
                builder.add(
                    RouteGroup::Query,
                    pattern,
                    &read_methods,
                    on(get_or_post(), proxy_handler).with_state(proxy.clone()),
                )?;
            }
            builder
                .add(
                    RouteGroup::Query,
                    APPS_ROUTE,
                    &[Method::GET],
                    get(proxy_handler).with_state(proxy.clone()),
                )?
                .add(
                    RouteGroup::Query,
                    APPS_ROUTE,
                    &[Method::DELETE],
                    delete(proxy_handler)
                        .route_layer(admin_only)
                        .with_state(proxy.clone()),
                )?;
        }
    }
    Ok(())
}

/// Roles allowed to push profiles when ingestion auth is on.
pub const INGEST_ROLES: &[Role] = &[Role::Agent, Role::Admin];

/// Register `POST /ingest`. With ingestion auth on, only agents and admins
/// get through.
pub fn register_ingest_route(
    builder: &mut RouteTableBuilder,
    ingester: Arc<dyn Ingester>,
    auth_enforced: bool,
) -> Result<(), RouteTableError> {
    let handler: MethodRouter = axum::routing::post(ingest)
        .route_layer(from_fn_with_state(
            RoleGate::one_of(INGEST_ROLES, auth_enforced),
            require_role,
        ))
        .with_state(ingester);
    builder.add(RouteGroup::Ingest, "/ingest", &[Method::POST], handler)?;
    Ok(())
}
