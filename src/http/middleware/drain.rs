//! Drain gate: refuse new gated requests with 503 once draining.

use axum::extract::{MatchedPath, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::lifecycle::DrainState;
use crate::observability::metrics;

pub async fn drain_gate(State(drain): State<DrainState>, request: Request, next: Next) -> Response {
    if drain.is_draining() {
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());
        tracing::debug!(route = %route, "Rejecting request while draining");
        metrics::record_drain_rejection(&route);
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    next.run(request).await
}
