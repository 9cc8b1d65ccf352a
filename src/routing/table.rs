//! Immutable route table.
//!
//! # Responsibilities
//! - Record every (pattern, method) pair with its group and handler
//! - Reject duplicate registrations and patterns split across groups
//! - Assemble the final axum Router, one middleware subset per group

use std::collections::BTreeSet;

use axum::handler::Handler;
use axum::http::Method;
use axum::routing::MethodRouter;
use axum::Router;
use thiserror::Error;

use crate::http::middleware::MiddlewareChain;
use crate::routing::group::RouteGroup;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteTableError {
    #[error("{method} {pattern} is registered twice")]
    Conflict { pattern: String, method: Method },
    #[error("{pattern} is registered in both the {first} and {second} groups")]
    GroupConflict {
        pattern: String,
        first: RouteGroup,
        second: RouteGroup,
    },
    #[error("route pattern {0:?} must start with '/'")]
    InvalidPattern(String),
}

#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub pattern: String,
    pub methods: Vec<Method>,
    pub group: RouteGroup,
    handler: MethodRouter,
}

#[derive(Default)]
pub struct RouteTableBuilder {
    entries: Vec<RouteEntry>,
    fallback: Option<Router>,
}

impl RouteTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `methods` on `pattern`. The handler must only
    /// answer the listed methods.
    pub fn add(
        &mut self,
        group: RouteGroup,
        pattern: &str,
        methods: &[Method],
        handler: MethodRouter,
    ) -> Result<&mut Self, RouteTableError> {
        if !pattern.starts_with('/') {
            return Err(RouteTableError::InvalidPattern(pattern.to_string()));
        }

        for existing in self.entries.iter().filter(|e| e.pattern == pattern) {
            if existing.group != group {
                return Err(RouteTableError::GroupConflict {
                    pattern: pattern.to_string(),
                    first: existing.group,
                    second: group,
                });
            }
            if let Some(method) = methods.iter().find(|m| existing.methods.contains(m)) {
                return Err(RouteTableError::Conflict {
                    pattern: pattern.to_string(),
                    method: method.clone(),
                });
            }
        }

        self.entries.push(RouteEntry {
            pattern: pattern.to_string(),
            methods: methods.to_vec(),
            group,
            handler,
        });
        Ok(self)
    }

    /// Handler for requests no route matches.
    pub fn fallback<H, T>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.fallback = Some(Router::new().fallback(handler));
        self
    }

    pub fn build(self) -> RouteTable {
        RouteTable {
            entries: self.entries,
            fallback: self.fallback,
        }
    }
}

pub struct RouteTable {
    entries: Vec<RouteEntry>,
    fallback: Option<Router>,
}

impl RouteTable {
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn group_of(&self, pattern: &str) -> Option<RouteGroup> {
        self.entries
            .iter()
            .find(|e| e.pattern == pattern)
            .map(|e| e.group)
    }

    /// Distinct patterns registered under `group`, sorted.
    pub fn patterns(&self, group: RouteGroup) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.group == group)
            .map(|e| e.pattern.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Build the router. Each group gets its own slice of `chain`; the
    /// fallback runs under the unrestricted slice.
    pub fn into_router(self, chain: &MiddlewareChain) -> Router {
        let mut app = Router::new();

        for group in RouteGroup::ALL {
            let mut router = Router::new();
            let mut populated = false;
            for entry in self.entries.iter().filter(|e| e.group == group) {
                router = router.route(&entry.pattern, entry.handler.clone());
                populated = true;
            }
            if populated {
                app = app.merge(chain.apply(router, group));
            }
        }

        match self.fallback {
            Some(fallback) => app.merge(chain.apply(fallback, RouteGroup::Unrestricted)),
            None => app,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::{delete, get, post};

    async fn ok() -> &'static str {
        "ok"
    }

    #[test]
    fn same_method_twice_is_a_conflict() {
        let mut builder = RouteTableBuilder::new();
        builder
            .add(RouteGroup::Query, "/render", &[Method::GET], get(ok))
            .unwrap();
        let err = builder
            .add(RouteGroup::Query, "/render", &[Method::GET], get(ok))
            .err()
            .unwrap();
        assert_eq!(
            err,
            RouteTableError::Conflict {
                pattern: "/render".into(),
                method: Method::GET
            }
        );
    }

    #[test]
    fn distinct_methods_share_a_pattern() {
        let mut builder = RouteTableBuilder::new();
        builder
            .add(RouteGroup::Query, "/api/apps", &[Method::GET], get(ok))
            .unwrap()
            .add(RouteGroup::Query, "/api/apps", &[Method::DELETE], delete(ok))
            .unwrap();
        let table = builder.build();
        assert_eq!(table.entries().len(), 2);
        assert_eq!(table.patterns(RouteGroup::Query), vec!["/api/apps"]);
    }

    #[test]
    fn patterns_are_listed_once_each() {
        let mut builder = RouteTableBuilder::new();
        builder
            .add(RouteGroup::Query, "/render", &[Method::GET], get(ok))
            .unwrap()
            .add(RouteGroup::Query, "/labels", &[Method::GET], get(ok))
            .unwrap()
            .add(RouteGroup::Query, "/render", &[Method::POST], post(ok))
            .unwrap();
        let table = builder.build();
        assert_eq!(table.patterns(RouteGroup::Query), vec!["/labels", "/render"]);
        assert!(table.patterns(RouteGroup::Browser).is_empty());
    }

    #[test]
    fn pattern_belongs_to_one_group() {
        let mut builder = RouteTableBuilder::new();
        builder
            .add(RouteGroup::Public, "/login", &[Method::GET], get(ok))
            .unwrap();
        let err = builder
            .add(RouteGroup::Browser, "/login", &[Method::POST], post(ok))
            .err()
            .unwrap();
        assert!(matches!(err, RouteTableError::GroupConflict { .. }));
    }

    #[test]
    fn relative_pattern_is_rejected() {
        let mut builder = RouteTableBuilder::new();
        let err = builder
            .add(RouteGroup::Public, "login", &[Method::GET], get(ok))
            .err()
            .unwrap();
        assert_eq!(err, RouteTableError::InvalidPattern("login".into()));
    }

    #[test]
    fn group_lookup() {
        let mut builder = RouteTableBuilder::new();
        builder
            .add(RouteGroup::Unrestricted, "/healthz", &[Method::GET], get(ok))
            .unwrap();
        let table = builder.build();
        assert_eq!(table.group_of("/healthz"), Some(RouteGroup::Unrestricted));
        assert_eq!(table.group_of("/nope"), None);
    }
}
