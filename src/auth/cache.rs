//! Bounded, time-limited cache in front of token introspection.
//!
//! Keyed by the raw token. Entries leave the cache when it is full or when
//! their TTL runs out, whichever happens first. Failures are never cached,
//! so a token that becomes valid is picked up on the next request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use moka::future::Cache;

use crate::auth::context::{extract_token, AuthContext, AuthDelegate, AuthFailure, TokenIntrospector};
use crate::observability::metrics;

#[derive(Clone)]
pub struct CachingAuth {
    inner: Arc<dyn TokenIntrospector>,
    cache: Cache<String, AuthContext>,
    cookie_name: String,
}

impl CachingAuth {
    pub fn new(
        inner: Arc<dyn TokenIntrospector>,
        max_capacity: u64,
        ttl: Duration,
        cookie_name: impl Into<String>,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self {
            inner,
            cache,
            cookie_name: cookie_name.into(),
        }
    }

    /// Drop a cached resolution so the next request re-introspects.
    pub async fn invalidate(&self, token: &str) {
        self.cache.invalidate(token).await;
    }
}

#[async_trait]
impl AuthDelegate for CachingAuth {
    async fn resolve(&self, headers: &HeaderMap) -> Result<AuthContext, AuthFailure> {
        let (token, origin) =
            extract_token(headers, &self.cookie_name).ok_or(AuthFailure::MissingToken)?;

        if let Some(mut ctx) = self.cache.get(token.as_str()).await {
            metrics::record_auth_cache(true);
            ctx.origin = origin;
            return Ok(ctx);
        }
        metrics::record_auth_cache(false);

        let ctx = self.inner.introspect(&token, origin).await?;
        self.cache.insert(token, ctx.clone()).await;
        Ok(ctx)
    }
}
