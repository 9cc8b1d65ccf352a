//! HTTP control plane of a continuous-profiling server.

pub mod auth;
pub mod config;
pub mod diagnostics;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod query;
pub mod remote;
pub mod routing;
pub mod services;

pub use config::ServerConfig;
pub use http::{HttpServer, ServerError};
pub use lifecycle::{Shutdown, ShutdownReport};
pub use services::Collaborators;
