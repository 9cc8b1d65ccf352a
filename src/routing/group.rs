//! Route groups: partitions of the route table that share one middleware
//! treatment.

use std::fmt;

/// What the auth gate answers when a group's request carries no usable
/// identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureMode {
    /// Plain 401, for machine-facing routes.
    Unauthorized,
    /// 307 to the login page, for browser-facing routes.
    RedirectToLogin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteGroup {
    /// Login, logout, signup and identity-provider flows.
    Public,
    /// Profile ingestion.
    Ingest,
    /// Query API answered locally or by the remote-read proxy.
    Query,
    /// Pages served as the SPA shell.
    Browser,
    /// Build, config, targets and debug endpoints.
    DiagnosticSecure,
    /// Health and metrics.
    Unrestricted,
    /// Static files.
    Asset,
}

impl RouteGroup {
    pub const ALL: [RouteGroup; 7] = [
        RouteGroup::Public,
        RouteGroup::Ingest,
        RouteGroup::Query,
        RouteGroup::Browser,
        RouteGroup::DiagnosticSecure,
        RouteGroup::Unrestricted,
        RouteGroup::Asset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteGroup::Public => "public",
            RouteGroup::Ingest => "ingest",
            RouteGroup::Query => "query",
            RouteGroup::Browser => "browser",
            RouteGroup::DiagnosticSecure => "diagnostic_secure",
            RouteGroup::Unrestricted => "unrestricted",
            RouteGroup::Asset => "asset",
        }
    }

    /// Requests are refused with 503 once the process drains.
    pub fn drain_gated(&self) -> bool {
        matches!(
            self,
            RouteGroup::Ingest | RouteGroup::Query | RouteGroup::Browser | RouteGroup::Asset
        )
    }

    /// How an unresolved identity is answered, or `None` for groups that
    /// never pass through the auth gate. Whether the gate is active is up to
    /// configuration.
    pub fn auth_failure(&self) -> Option<AuthFailureMode> {
        match self {
            RouteGroup::Ingest | RouteGroup::Query | RouteGroup::DiagnosticSecure => {
                Some(AuthFailureMode::Unauthorized)
            }
            RouteGroup::Browser => Some(AuthFailureMode::RedirectToLogin),
            RouteGroup::Public | RouteGroup::Unrestricted | RouteGroup::Asset => None,
        }
    }
}

impl fmt::Display for RouteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_skip_drain_but_not_auth() {
        let group = RouteGroup::DiagnosticSecure;
        assert!(!group.drain_gated());
        assert_eq!(group.auth_failure(), Some(AuthFailureMode::Unauthorized));
    }

    #[test]
    fn assets_skip_auth_but_not_drain() {
        let group = RouteGroup::Asset;
        assert!(group.drain_gated());
        assert_eq!(group.auth_failure(), None);
    }

    #[test]
    fn only_browser_routes_redirect() {
        let redirecting: Vec<_> = RouteGroup::ALL
            .into_iter()
            .filter(|g| g.auth_failure() == Some(AuthFailureMode::RedirectToLogin))
            .collect();
        assert_eq!(redirecting, vec![RouteGroup::Browser]);
    }
}
