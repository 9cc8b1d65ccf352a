//! Authentication and authorization.
//!
//! # Data Flow
//! ```text
//! Request → http::middleware::auth (per group)
//!     → AuthDelegate::resolve
//!         SessionAuth   (session.rs)  signed token, embedded role
//!         CachingAuth   (cache.rs)    moka cache → StoreIntrospector on miss
//!     → AuthContext in request extensions
//!     → RoleGate (per route) → 403 when the role is too low
//!
//! Sign-in (handlers.rs, public group):
//!     POST /login, POST /signup         → UserStore → session cookie
//!     /auth/{provider}/login|callback|redirect
//!         → IdentityProvider (oauth/) → UserStore::find_or_create_external
//!         → session cookie
//! ```

pub mod cache;
pub mod context;
pub mod handlers;
pub mod oauth;
pub mod role;
pub mod session;

pub use cache::CachingAuth;
pub use context::{AuthContext, AuthDelegate, AuthFailure, TokenIntrospector, TokenOrigin};
pub use handlers::{register_auth_routes, AuthRoutes};
pub use oauth::{IdentityProvider, OAuthError, OAuthProvider};
pub use role::Role;
pub use session::{SessionAuth, SessionTokens, StoreIntrospector};
