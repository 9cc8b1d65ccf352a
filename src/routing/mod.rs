//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route construction (at startup):
//!     ServerConfig + collaborators
//!     → table.rs (RouteTableBuilder::add per pattern/method/group)
//!     → conflicts are construction errors
//!     → freeze as RouteTable
//!
//! Router assembly:
//!     RouteTable
//!     → one axum Router per group.rs group
//!     → group's middleware subset applied (http::middleware::chain)
//!     → groups merged, SPA shell fallback attached
//! ```
//!
//! # Design Decisions
//! - Routes fixed at startup, immutable at runtime
//! - A pattern belongs to exactly one group
//! - Unmatched paths get the SPA shell with a 404 status

pub mod group;
pub mod table;

pub use group::{AuthFailureMode, RouteGroup};
pub use table::{RouteEntry, RouteTable, RouteTableBuilder, RouteTableError};
