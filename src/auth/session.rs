//! Signed session tokens.
//!
//! A session is an HS256 JWT carrying subject and role with a bounded
//! lifetime. [`SessionAuth`] trusts the embedded role; [`StoreIntrospector`]
//! also re-reads the user so role changes and disabled accounts are seen.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::context::{extract_token, AuthContext, AuthDelegate, AuthFailure, TokenIntrospector, TokenOrigin};
use crate::auth::role::Role;
use crate::services::users::UserStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct SessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
    cookie_name: String,
}

impl SessionTokens {
    pub fn new(secret: &[u8], lifetime: Duration, cookie_name: impl Into<String>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn issue(&self, subject: &str, role: Role) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp();
        let claims = SessionClaims {
            sub: subject.to_string(),
            role,
            iat: now,
            exp: now + self.lifetime.as_secs() as i64,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthFailure> {
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthFailure::Expired,
                _ => AuthFailure::InvalidToken(e.to_string()),
            })
    }

    /// `Set-Cookie` value carrying a freshly issued token.
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name,
            token,
            self.lifetime.as_secs()
        )
    }
}

/// `Set-Cookie` value that removes the cookie called `name`.
pub fn clear_cookie(name: &str) -> String {
    format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Resolves identity from the token payload alone.
#[derive(Clone)]
pub struct SessionAuth {
    tokens: SessionTokens,
}

impl SessionAuth {
    pub fn new(tokens: SessionTokens) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl AuthDelegate for SessionAuth {
    async fn resolve(&self, headers: &HeaderMap) -> Result<AuthContext, AuthFailure> {
        let (token, origin) =
            extract_token(headers, self.tokens.cookie_name()).ok_or(AuthFailure::MissingToken)?;
        let claims = self.tokens.verify(&token)?;
        Ok(AuthContext {
            subject: claims.sub,
            role: claims.role,
            origin,
        })
    }
}

/// Verifies the token, then asks the user store for the subject's current
/// role.
#[derive(Clone)]
pub struct StoreIntrospector {
    tokens: SessionTokens,
    users: Arc<dyn UserStore>,
}

impl StoreIntrospector {
    pub fn new(tokens: SessionTokens, users: Arc<dyn UserStore>) -> Self {
        Self { tokens, users }
    }
}

#[async_trait]
impl TokenIntrospector for StoreIntrospector {
    async fn introspect(&self, token: &str, origin: TokenOrigin) -> Result<AuthContext, AuthFailure> {
        let claims = self.tokens.verify(token)?;
        let user = self
            .users
            .find(&claims.sub)
            .await
            .ok_or_else(|| AuthFailure::UnknownSubject(claims.sub.clone()))?;
        if user.disabled {
            return Err(AuthFailure::Disabled(user.name));
        }
        Ok(AuthContext {
            subject: user.name,
            role: user.role,
            origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::users::InMemoryUserStore;
    use axum::http::{header, HeaderValue};

    fn tokens() -> SessionTokens {
        SessionTokens::new(b"test-secret", Duration::from_secs(3600), "session")
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = tokens();
        let token = tokens.issue("alice", Role::Editor).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, Role::Editor);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = SessionTokens::new(b"other-secret", Duration::from_secs(3600), "session");
        let token = other.issue("mallory", Role::Admin).unwrap();
        assert!(matches!(tokens().verify(&token), Err(AuthFailure::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let claims = SessionClaims {
            sub: "alice".into(),
            role: Role::Admin,
            iat: 1_000,
            exp: 2_000,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert_eq!(tokens().verify(&token), Err(AuthFailure::Expired));
    }

    #[tokio::test]
    async fn session_auth_reads_cookie() {
        let tokens = tokens();
        let token = tokens.issue("alice", Role::ReadOnly).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("session={token}")).unwrap(),
        );

        let ctx = SessionAuth::new(tokens).resolve(&headers).await.unwrap();
        assert_eq!(ctx.subject, "alice");
        assert_eq!(ctx.origin, TokenOrigin::SessionCookie);
    }

    #[tokio::test]
    async fn introspection_uses_current_role() {
        let tokens = tokens();
        let users = InMemoryUserStore::new();
        users.create("alice", "pw", Role::ReadOnly).await.unwrap();
        let token = tokens.issue("alice", Role::ReadOnly).unwrap();
        users.set_role("alice", Role::Admin);

        let introspector = StoreIntrospector::new(tokens, Arc::new(users.clone()));
        let ctx = introspector.introspect(&token, TokenOrigin::BearerHeader).await.unwrap();
        assert_eq!(ctx.role, Role::Admin);

        users.set_disabled("alice", true);
        assert_eq!(
            introspector.introspect(&token, TokenOrigin::BearerHeader).await,
            Err(AuthFailure::Disabled("alice".into()))
        );
    }

    #[tokio::test]
    async fn missing_credentials_fail() {
        let result = SessionAuth::new(tokens()).resolve(&HeaderMap::new()).await;
        assert_eq!(result, Err(AuthFailure::MissingToken));
    }
}
