//! User directory consulted by login, signup, OAuth and token introspection.
//!
//! Passwords are kept as salted PBKDF2-HMAC-SHA256 hashes and checked in
//! constant time.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::RngCore;
use ring::pbkdf2;
use thiserror::Error;

use crate::auth::role::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub role: Role,
    pub disabled: bool,
    /// Identity provider the user signed up through, if any.
    pub provider: Option<String>,
}

/// Identity returned by an external provider after a successful callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub provider: String,
    pub login: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserStoreError {
    #[error("user {0:?} already exists")]
    AlreadyExists(String),
    #[error("user {0:?} is disabled")]
    Disabled(String),
    #[error("user store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, name: &str) -> Option<User>;

    /// Returns the user when the password matches.
    async fn authenticate(&self, name: &str, password: &str) -> Option<User>;

    async fn create(&self, name: &str, password: &str, role: Role) -> Result<User, UserStoreError>;

    /// Look up the local account for an external identity, creating it with
    /// `default_role` on first sight.
    async fn find_or_create_external(
        &self,
        identity: &ExternalIdentity,
        default_role: Role,
    ) -> Result<User, UserStoreError>;
}

const PBKDF2_ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
const PBKDF2_ITERATIONS: NonZeroU32 = NonZeroU32::MIN.saturating_add(99_999);
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PasswordHash {
    salt: [u8; SALT_LEN],
    hash: [u8; HASH_LEN],
}

impl PasswordHash {
    fn new(password: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let mut hash = [0u8; HASH_LEN];
        pbkdf2::derive(
            PBKDF2_ALGORITHM,
            PBKDF2_ITERATIONS,
            &salt,
            password.as_bytes(),
            &mut hash,
        );
        Self { salt, hash }
    }

    fn matches(&self, password: &str) -> bool {
        pbkdf2::verify(
            PBKDF2_ALGORITHM,
            PBKDF2_ITERATIONS,
            &self.salt,
            password.as_bytes(),
            &self.hash,
        )
        .is_ok()
    }
}

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password: Option<PasswordHash>,
}

/// Process-local user store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<DashMap<String, StoredUser>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change a user's role. Sessions pick up the new role on their next
    /// introspection.
    pub fn set_role(&self, name: &str, role: Role) -> bool {
        match self.users.get_mut(name) {
            Some(mut stored) => {
                stored.user.role = role;
                true
            }
            None => false,
        }
    }

    pub fn set_disabled(&self, name: &str, disabled: bool) -> bool {
        match self.users.get_mut(name) {
            Some(mut stored) => {
                stored.user.disabled = disabled;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find(&self, name: &str) -> Option<User> {
        self.users.get(name).map(|s| s.user.clone())
    }

    async fn authenticate(&self, name: &str, password: &str) -> Option<User> {
        let stored = self.users.get(name)?;
        let hash = stored.password.as_ref()?;
        if hash.matches(password) && !stored.user.disabled {
            Some(stored.user.clone())
        } else {
            None
        }
    }

    async fn create(&self, name: &str, password: &str, role: Role) -> Result<User, UserStoreError> {
        match self.users.entry(name.to_string()) {
            Entry::Occupied(_) => Err(UserStoreError::AlreadyExists(name.to_string())),
            Entry::Vacant(slot) => {
                let user = User {
                    name: name.to_string(),
                    role,
                    disabled: false,
                    provider: None,
                };
                slot.insert(StoredUser {
                    user: user.clone(),
                    password: Some(PasswordHash::new(password)),
                });
                Ok(user)
            }
        }
    }

    async fn find_or_create_external(
        &self,
        identity: &ExternalIdentity,
        default_role: Role,
    ) -> Result<User, UserStoreError> {
        let stored = self
            .users
            .entry(identity.login.clone())
            .or_insert_with(|| StoredUser {
                user: User {
                    name: identity.login.clone(),
                    role: default_role,
                    disabled: false,
                    provider: Some(identity.provider.clone()),
                },
                password: None,
            });
        if stored.user.disabled {
            return Err(UserStoreError::Disabled(identity.login.clone()));
        }
        Ok(stored.user.clone())
    }
}
