//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (axum-server)
//!     → server.rs (request timeout over the whole router)
//!     → per-group middleware (middleware/chain.rs)
//!     → handler, or the SPA shell (shell.rs) with 404 when nothing matched
//!     → response.rs (redirects under the base URL, error mapping)
//! ```

pub mod middleware;
pub mod response;
pub mod server;
pub mod shell;

pub use middleware::X_REQUEST_ID;
pub use response::BaseUrl;
pub use server::{HttpServer, ServerError, BROWSER_ROUTES};
pub use shell::SpaShell;
