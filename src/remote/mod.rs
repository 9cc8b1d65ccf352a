//! Remote read.
//!
//! # Data Flow
//! ```text
//! Construction:
//!     RemoteReadConfig
//!     → decider.rs: disabled → Local(engine)
//!                   enabled  → proxy.rs builds the client → Remote(proxy)
//!                                                 or fails → Unavailable (routes omitted)
//!
//! Request (Remote only):
//!     query route → RemoteReadProxy::forward → upstream → response streamed back
//! ```

pub mod decider;
pub mod proxy;

pub use decider::{decide, BackendMode, QueryBackend};
pub use proxy::{proxy_handler, ProxyBuildError, RemoteReadProxy};
