//! External identity providers.
//!
//! Every provider exposes the same capability set, so the route table
//! registers `/auth/{provider}/login|callback|redirect` by iterating the
//! enabled providers instead of spelling each vendor out.

pub mod provider;

use async_trait::async_trait;
use thiserror::Error;

use crate::services::users::ExternalIdentity;

pub use provider::OAuthProvider;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("invalid {field} for provider {provider}: {reason}")]
    InvalidEndpoint {
        provider: &'static str,
        field: &'static str,
        reason: String,
    },
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("code exchange rejected: {0}")]
    Exchange(String),
    #[error("provider profile has no usable login")]
    MissingIdentity,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Path segment under `/auth/`.
    fn name(&self) -> &'static str;

    /// Provider URL the browser is sent to in order to sign in.
    fn login_url(&self, state: &str, redirect_uri: &str) -> String;

    /// Trade an authorization code for the identity behind it.
    async fn exchange_callback(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ExternalIdentity, OAuthError>;

    /// Callback URL registered with the provider, when configured
    /// explicitly.
    fn configured_redirect(&self) -> Option<&str> {
        None
    }

    /// Route that completes the flow once the provider calls back.
    fn redirect_route(&self) -> String {
        format!("/auth/{}/redirect", self.name())
    }

    fn callback_route(&self) -> String {
        format!("/auth/{}/callback", self.name())
    }

    fn login_route(&self) -> String {
        format!("/auth/{}/login", self.name())
    }
}
