//! Middleware chain.
//!
//! The order is fixed by [`CHAIN`], outermost first:
//!
//! | slot        | kind      | contract                                            |
//! |-------------|-----------|-----------------------------------------------------|
//! | Decode      | transform | request bodies arrive decompressed                  |
//! | Drain       | gate      | 503 for drain-gated groups once draining            |
//! | Auth        | gate      | resolves identity or answers 401 / 307 per group    |
//! | Cors        | transform | preflight and CORS headers, only if origins are set |
//! | Compression | transform | gzip above 2000 bytes, fastest level                |
//! | Metrics     | observe   | counts and times uncompressed handler output        |
//! | AccessLog   | observe   | request id, span, status and latency                |
//!
//! Groups select a subset: gates that do not apply to a group are left out,
//! the remaining slots keep their relative order.

use std::collections::HashMap;
use std::sync::Arc;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::Router;
use tower_http::compression::predicate::{NotForContentType, Predicate, SizeAbove};
use tower_http::compression::{CompressionLayer, CompressionLevel};
use tower_http::cors::CorsLayer;
use tower_http::decompression::RequestDecompressionLayer;

use super::{access_log, auth, drain, metrics};
use crate::auth::context::AuthDelegate;
use crate::http::response::BaseUrl;
use crate::lifecycle::DrainState;
use crate::routing::RouteGroup;

/// Responses smaller than this are sent uncompressed.
pub const COMPRESSION_THRESHOLD: u16 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// May answer the request itself instead of calling the next slot.
    Gate,
    /// Rewrites the request or response.
    Transform,
    /// Records, never changes the outcome.
    Observe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MiddlewareSlot {
    Decode,
    Drain,
    Auth,
    Cors,
    Compression,
    Metrics,
    AccessLog,
}

impl MiddlewareSlot {
    pub fn kind(&self) -> SlotKind {
        match self {
            MiddlewareSlot::Drain | MiddlewareSlot::Auth => SlotKind::Gate,
            MiddlewareSlot::Decode | MiddlewareSlot::Cors | MiddlewareSlot::Compression => {
                SlotKind::Transform
            }
            MiddlewareSlot::Metrics | MiddlewareSlot::AccessLog => SlotKind::Observe,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MiddlewareSlot::Decode => "decode",
            MiddlewareSlot::Drain => "drain",
            MiddlewareSlot::Auth => "auth",
            MiddlewareSlot::Cors => "cors",
            MiddlewareSlot::Compression => "compression",
            MiddlewareSlot::Metrics => "metrics",
            MiddlewareSlot::AccessLog => "access_log",
        }
    }
}

/// Outermost first.
pub const CHAIN: [MiddlewareSlot; 7] = [
    MiddlewareSlot::Decode,
    MiddlewareSlot::Drain,
    MiddlewareSlot::Auth,
    MiddlewareSlot::Cors,
    MiddlewareSlot::Compression,
    MiddlewareSlot::Metrics,
    MiddlewareSlot::AccessLog,
];

/// Slots a group is declared to pass through, outermost first.
pub fn slots_for(group: RouteGroup) -> Vec<MiddlewareSlot> {
    CHAIN
        .into_iter()
        .filter(|slot| match slot {
            MiddlewareSlot::Drain => group.drain_gated(),
            MiddlewareSlot::Auth => group.auth_failure().is_some(),
            _ => true,
        })
        .collect()
}

#[derive(Clone)]
pub struct MiddlewareChain {
    drain: DrainState,
    base: BaseUrl,
    cors: Option<CorsLayer>,
    delegates: HashMap<RouteGroup, Arc<dyn AuthDelegate>>,
}

impl MiddlewareChain {
    pub fn new(drain: DrainState, base: BaseUrl, cors: Option<CorsLayer>) -> Self {
        Self {
            drain,
            base,
            cors,
            delegates: HashMap::new(),
        }
    }

    /// Enable the auth gate for `group`. Ignored for groups that never
    /// authenticate.
    pub fn with_auth(mut self, group: RouteGroup, delegate: Arc<dyn AuthDelegate>) -> Self {
        if group.auth_failure().is_some() {
            self.delegates.insert(group, delegate);
        }
        self
    }

    pub fn auth_enabled(&self, group: RouteGroup) -> bool {
        self.delegates.contains_key(&group)
    }

    /// Slots that actually wrap `group`'s routes under this configuration.
    pub fn active_slots(&self, group: RouteGroup) -> Vec<MiddlewareSlot> {
        slots_for(group)
            .into_iter()
            .filter(|slot| match slot {
                MiddlewareSlot::Auth => self.auth_enabled(group),
                MiddlewareSlot::Cors => self.cors.is_some(),
                _ => true,
            })
            .collect()
    }

    /// Wrap `router` with the group's slots. Layers are added innermost
    /// first, since the last `layer` call ends up outermost.
    pub fn apply(&self, router: Router, group: RouteGroup) -> Router {
        let mut router = router;
        for slot in self.active_slots(group).into_iter().rev() {
            router = match slot {
                MiddlewareSlot::Decode => router.layer(RequestDecompressionLayer::new()),
                MiddlewareSlot::Drain => {
                    router.layer(from_fn_with_state(self.drain.clone(), drain::drain_gate))
                }
                MiddlewareSlot::Auth => match (self.delegates.get(&group), group.auth_failure()) {
                    (Some(delegate), Some(mode)) => {
                        let gate = auth::AuthGate::new(delegate.clone(), mode, self.base.clone());
                        router.layer(from_fn_with_state(gate, auth::auth_gate))
                    }
                    _ => router,
                },
                MiddlewareSlot::Cors => match &self.cors {
                    Some(cors) => router.layer(cors.clone()),
                    None => router,
                },
                MiddlewareSlot::Compression => router.layer(compression_layer()),
                MiddlewareSlot::Metrics => router.layer(from_fn(metrics::track_metrics)),
                MiddlewareSlot::AccessLog => access_log::apply(router),
            };
        }
        router
    }
}

fn compression_layer() -> CompressionLayer<impl Predicate> {
    CompressionLayer::new()
        .quality(CompressionLevel::Fastest)
        .compress_when(SizeAbove::new(COMPRESSION_THRESHOLD).and(NotForContentType::IMAGES))
}
