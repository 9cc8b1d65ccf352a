//! Request middleware.
//!
//! `chain.rs` owns the order; the other files hold one slot each.

pub mod access_log;
pub mod auth;
pub mod chain;
pub mod cors;
pub mod drain;
pub mod metrics;

pub use access_log::X_REQUEST_ID;
pub use auth::{require_role, AuthGate, RoleGate, RoleRequirement};
pub use chain::{slots_for, MiddlewareChain, MiddlewareSlot, SlotKind, CHAIN};
pub use cors::cors_layer;
