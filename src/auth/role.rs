//! User roles.
//!
//! Roles form a closed, ordered set. A route that asks for a minimum role
//! accepts every role at or above it.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    ReadOnly,
    Agent,
    Editor,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role {0:?}")]
pub struct ParseRoleError(pub String);

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ReadOnly => "ReadOnly",
            Role::Agent => "Agent",
            Role::Editor => "Editor",
            Role::Admin => "Admin",
        }
    }

    /// True when this role satisfies a `minimum` requirement.
    pub fn at_least(&self, minimum: Role) -> bool {
        *self >= minimum
    }
}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "readonly" | "read-only" | "reader" => Ok(Role::ReadOnly),
            "agent" => Ok(Role::Agent),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
