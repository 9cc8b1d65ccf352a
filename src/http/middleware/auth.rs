//! Auth gate and role gate.
//!
//! The auth gate resolves an [`AuthContext`] through the group's delegate and
//! stores it in the request extensions. The role gate runs per route, after
//! the auth gate, and compares the resolved role with the route's
//! requirement: a minimum role, or an explicit set of roles.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::auth::context::{AuthContext, AuthDelegate};
use crate::auth::role::Role;
use crate::http::response::{login_redirect, BaseUrl};
use crate::observability::metrics;
use crate::routing::AuthFailureMode;

#[derive(Clone)]
pub struct AuthGate {
    delegate: Arc<dyn AuthDelegate>,
    on_failure: AuthFailureMode,
    base: BaseUrl,
}

impl AuthGate {
    pub fn new(delegate: Arc<dyn AuthDelegate>, on_failure: AuthFailureMode, base: BaseUrl) -> Self {
        Self {
            delegate,
            on_failure,
            base,
        }
    }
}

pub async fn auth_gate(State(gate): State<AuthGate>, mut request: Request, next: Next) -> Response {
    match gate.delegate.resolve(request.headers()).await {
        Ok(ctx) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(failure) => {
            tracing::debug!(
                path = %request.uri().path(),
                reason = %failure,
                "Request has no valid identity"
            );
            metrics::record_auth_failure(failure.outcome());
            match gate.on_failure {
                AuthFailureMode::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
                AuthFailureMode::RedirectToLogin => login_redirect(&gate.base),
            }
        }
    }
}

/// Role requirement for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequirement {
    AtLeast(Role),
    OneOf(&'static [Role]),
}

impl RoleRequirement {
    pub fn admits(&self, role: Role) -> bool {
        match self {
            RoleRequirement::AtLeast(min) => role.at_least(*min),
            RoleRequirement::OneOf(roles) => roles.contains(&role),
        }
    }
}

impl std::fmt::Display for RoleRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleRequirement::AtLeast(min) => write!(f, ">={min}"),
            RoleRequirement::OneOf(roles) => {
                let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
                f.write_str(&names.join("|"))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RoleGate {
    requirement: RoleRequirement,
    /// False when no auth strategy covers the route; the gate then lets
    /// everything through.
    enforced: bool,
}

impl RoleGate {
    pub fn new(min: Role, enforced: bool) -> Self {
        Self {
            requirement: RoleRequirement::AtLeast(min),
            enforced,
        }
    }

    /// Admit exactly the listed roles.
    pub fn one_of(roles: &'static [Role], enforced: bool) -> Self {
        Self {
            requirement: RoleRequirement::OneOf(roles),
            enforced,
        }
    }
}

pub async fn require_role(State(gate): State<RoleGate>, request: Request, next: Next) -> Response {
    if !gate.enforced {
        return next.run(request).await;
    }

    match request.extensions().get::<AuthContext>() {
        None => {
            metrics::record_auth_failure("missing_token");
            StatusCode::UNAUTHORIZED.into_response()
        }
        Some(ctx) if !gate.requirement.admits(ctx.role) => {
            tracing::info!(
                subject = %ctx.subject,
                role = ctx.role.as_str(),
                required = %gate.requirement,
                path = %request.uri().path(),
                "Forbidden: role not allowed"
            );
            metrics::record_forbidden();
            StatusCode::FORBIDDEN.into_response()
        }
        Some(_) => next.run(request).await,
    }
}
