//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs + http::server):
//!     trigger → DrainState::begin_drain (immediate)
//!             → stop accepting
//!             → wait up to the grace period for in-flight requests
//!             → close what is left, report whether the grace ran out
//! ```
//!
//! The drain flip never waits on the grace period: gated routes answer 503
//! from the moment the signal arrives.

pub mod drain;
pub mod shutdown;
pub mod signals;

pub use drain::DrainState;
pub use shutdown::{Shutdown, ShutdownReport};
