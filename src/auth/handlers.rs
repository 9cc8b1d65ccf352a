//! Login, logout, signup and identity-provider routes.
//!
//! All of them live in the public group: they must work without an identity
//! and keep working while the process drains.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, RawQuery, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, on, post, MethodFilter};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::context::cookie_value;
use crate::auth::oauth::IdentityProvider;
use crate::auth::role::Role;
use crate::auth::session::{clear_cookie, SessionTokens};
use crate::http::response::{login_redirect, redirect, redirect_to, with_cookie, BaseUrl};
use crate::http::shell::SpaShell;
use crate::routing::{RouteGroup, RouteTableBuilder, RouteTableError};
use crate::services::{User, UserStore, UserStoreError};

const OAUTH_STATE_COOKIE: &str = "oauthState";
const OAUTH_STATE_MAX_AGE_SECS: u64 = 600;

/// Everything the auth routes need, handed over by the server.
#[derive(Clone)]
pub struct AuthRoutes {
    pub users: Arc<dyn UserStore>,
    /// `None` when no auth strategy is configured; login and signup are then
    /// not offered.
    pub sessions: Option<SessionTokens>,
    pub cookie_name: String,
    pub internal_enabled: bool,
    pub signup_enabled: bool,
    pub default_role: Role,
    pub providers: Vec<Arc<dyn IdentityProvider>>,
    pub shell: SpaShell,
    pub base: BaseUrl,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct Profile {
    name: String,
    role: Role,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            role: user.role,
        }
    }
}

#[derive(Clone)]
struct LoginState {
    users: Arc<dyn UserStore>,
    sessions: SessionTokens,
    signup_enabled: bool,
    default_role: Role,
}

async fn login(State(state): State<LoginState>, Json(creds): Json<Credentials>) -> Response {
    let Some(user) = state.users.authenticate(&creds.username, &creds.password).await else {
        tracing::debug!(user = %creds.username, "Login rejected");
        return StatusCode::UNAUTHORIZED.into_response();
    };
    session_response(&state.sessions, user, StatusCode::OK)
}

async fn signup(State(state): State<LoginState>, Json(creds): Json<Credentials>) -> Response {
    if !state.signup_enabled {
        return StatusCode::FORBIDDEN.into_response();
    }
    match state
        .users
        .create(&creds.username, &creds.password, state.default_role)
        .await
    {
        Ok(user) => {
            tracing::info!(user = %user.name, role = user.role.as_str(), "User signed up");
            (StatusCode::CREATED, Json(Profile::from(user))).into_response()
        }
        Err(e @ UserStoreError::AlreadyExists(_)) => {
            (StatusCode::CONFLICT, e.to_string()).into_response()
        }
        Err(e @ UserStoreError::Disabled(_)) => (StatusCode::FORBIDDEN, e.to_string()).into_response(),
        Err(e @ UserStoreError::Unavailable(_)) => {
            tracing::error!(error = %e, "User store failed during signup");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

fn session_response(sessions: &SessionTokens, user: User, status: StatusCode) -> Response {
    match sessions.issue(&user.name, user.role) {
        Ok(token) => with_cookie(
            (status, Json(Profile::from(user))).into_response(),
            &sessions.session_cookie(&token),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to sign session token");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Clone)]
struct LogoutState {
    cookie_name: String,
    base: BaseUrl,
}

async fn logout(State(state): State<LogoutState>) -> Response {
    with_cookie(
        login_redirect(&state.base),
        &clear_cookie(&state.cookie_name),
    )
}

#[derive(Clone)]
struct OAuthState {
    provider: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserStore>,
    sessions: SessionTokens,
    default_role: Role,
    base: BaseUrl,
}

impl OAuthState {
    /// Callback URL sent to the provider: configured explicitly, else derived
    /// from the base URL, else from the request's host.
    fn callback_uri(&self, headers: &HeaderMap) -> String {
        let route = self.provider.callback_route();
        if let Some(configured) = self.provider.configured_redirect() {
            return configured.to_string();
        }
        if self.base.is_absolute() {
            return self.base.join(&route);
        }
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");
        let scheme = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");
        format!("{scheme}://{host}{}", self.base.join(&route))
    }
}

async fn oauth_login(State(state): State<OAuthState>, headers: HeaderMap) -> Response {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let location = state
        .provider
        .login_url(&nonce, &state.callback_uri(&headers));
    with_cookie(
        redirect_to(&location),
        &format!(
            "{OAUTH_STATE_COOKIE}={nonce}; Path=/; HttpOnly; SameSite=Lax; Max-Age={OAUTH_STATE_MAX_AGE_SECS}"
        ),
    )
}

async fn oauth_callback(State(state): State<OAuthState>, RawQuery(query): RawQuery) -> Response {
    let mut route = state.provider.redirect_route();
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        route.push('?');
        route.push_str(&query);
    }
    redirect(&state.base, &route)
}

async fn oauth_redirect(
    State(state): State<OAuthState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let provider = state.provider.name();
    let expected = cookie_value(&headers, OAUTH_STATE_COOKIE);
    let (Some(code), Some(returned)) = (params.get("code"), params.get("state")) else {
        tracing::debug!(provider, "OAuth redirect without code or state");
        return login_redirect(&state.base);
    };
    if expected.as_deref() != Some(returned.as_str()) {
        tracing::debug!(provider, "OAuth state mismatch");
        return login_redirect(&state.base);
    }

    let identity = match state
        .provider
        .exchange_callback(code, &state.callback_uri(&headers))
        .await
    {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(provider, error = %e, "OAuth code exchange failed");
            return login_redirect(&state.base);
        }
    };

    let user = match state
        .users
        .find_or_create_external(&identity, state.default_role)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::info!(provider, login = %identity.login, error = %e, "OAuth sign-in refused");
            return login_redirect(&state.base);
        }
    };

    let token = match state.sessions.issue(&user.name, user.role) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "Failed to sign session token");
            return login_redirect(&state.base);
        }
    };
    tracing::info!(provider, user = %user.name, "OAuth sign-in");

    let response = with_cookie(redirect(&state.base, "/"), &state.sessions.session_cookie(&token));
    with_cookie(response, &clear_cookie(OAUTH_STATE_COOKIE))
}

/// Register the public group.
pub fn register_auth_routes(
    builder: &mut RouteTableBuilder,
    routes: &AuthRoutes,
) -> Result<(), RouteTableError> {
    let public = RouteGroup::Public;
    let shell = routes.shell.clone();
    let shell_page = get(move || {
        let shell = shell.clone();
        async move { shell.respond(StatusCode::OK) }
    });

    builder
        .add(public, "/login", &[Method::GET], shell_page.clone())?
        .add(public, "/signup", &[Method::GET], shell_page)?
        .add(
            public,
            "/logout",
            &[Method::GET, Method::POST],
            on(MethodFilter::GET.or(MethodFilter::POST), logout).with_state(LogoutState {
                cookie_name: routes.cookie_name.clone(),
                base: routes.base.clone(),
            }),
        )?;

    let Some(sessions) = routes.sessions.clone() else {
        return Ok(());
    };

    if routes.internal_enabled {
        let state = LoginState {
            users: routes.users.clone(),
            sessions: sessions.clone(),
            signup_enabled: routes.signup_enabled,
            default_role: routes.default_role,
        };
        builder
            .add(public, "/login", &[Method::POST], post(login).with_state(state.clone()))?
            .add(public, "/signup", &[Method::POST], post(signup).with_state(state))?;
    }

    for provider in &routes.providers {
        let state = OAuthState {
            provider: provider.clone(),
            users: routes.users.clone(),
            sessions: sessions.clone(),
            default_role: routes.default_role,
            base: routes.base.clone(),
        };
        builder
            .add(
                public,
                &provider.login_route(),
                &[Method::GET],
                get(oauth_login).with_state(state.clone()),
            )?
            .add(
                public,
                &provider.callback_route(),
                &[Method::GET],
                get(oauth_callback).with_state(state.clone()),
            )?
            .add(
                public,
                &provider.redirect_route(),
                &[Method::GET],
                get(oauth_redirect).with_state(state),
            )?;
        tracing::debug!(provider = provider.name(), "Identity provider routes registered");
    }

    Ok(())
}
