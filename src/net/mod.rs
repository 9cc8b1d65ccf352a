//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! tokio TcpListener (bound by main, or by tests on port 0)
//!     → tls.rs (optional: RustlsConfig from PEM files)
//!     → axum_server (plain or rustls acceptor)
//!     → Hand off to the HTTP router
//! ```

pub mod tls;

pub use tls::load_tls_config;
