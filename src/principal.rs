//! Principals and the user-store seam
//!
//! The [`Principal`] is owned by the host's user store; the auth core reads it
//! through [`PrincipalStore::find_by_username`] and applies every lockout or
//! login transition through [`PrincipalStore::update`].
//!
//! # Concurrency
//!
//! `update` is a read-modify-write of one principal and must be atomic with
//! respect to other writers of that principal (row lock, `SELECT ... FOR
//! UPDATE`, optimistic version check with retry). Transitions computed by the
//! lockout tracker assume they are applied one at a time per principal.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::constant_time_str_eq;

/// Roles recognised by the review application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Reviewer,
    Radiologist,
    Technician,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Reviewer => "reviewer",
            Self::Radiologist => "radiologist",
            Self::Technician => "technician",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a role name is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" | "administrator" => Ok(Self::Admin),
            "reviewer" => Ok(Self::Reviewer),
            "radiologist" => Ok(Self::Radiologist),
            "technician" => Ok(Self::Technician),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// An outstanding password reset: token and expiry always travel together.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordReset {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for PasswordReset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordReset")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl PasswordReset {
    /// Whether `candidate` matches this reset and the window is still open.
    pub fn is_valid_for(&self, candidate: &str, now: DateTime<Utc>) -> bool {
        now < self.expires_at && constant_time_str_eq(&self.token, candidate)
    }
}

/// The identity record consumed by the auth core.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Unique login name; also the token subject
    pub username: String,
    pub email: String,
    /// Opaque PHC hash string
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    /// Consecutive failed logins since the last success
    pub failed_login_attempts: u32,
    /// Set when the failure threshold is reached
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub password_reset: Option<PasswordReset>,
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("failed_login_attempts", &self.failed_login_attempts)
            .field("locked_until", &self.locked_until)
            .field("last_login", &self.last_login)
            .field("password_reset", &self.password_reset)
            .finish()
    }
}

impl Principal {
    /// A fresh, active principal with no login history.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            role,
            is_active: true,
            failed_login_attempts: 0,
            locked_until: None,
            last_login: None,
            password_reset: None,
        }
    }

    /// Set the active flag.
    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    /// Drop any outstanding reset token (after it is used or revoked).
    pub fn clear_password_reset(&mut self) {
        self.password_reset = None;
    }
}

/// Failure reported by the external principal store.
///
/// Propagated to the caller unchanged; the auth core never retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or the operation failed
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A concurrent writer changed the record first
    #[error("write conflict: {0}")]
    Conflict(String),
}

/// Narrow interface to the host's user store.
pub trait PrincipalStore: Send + Sync {
    /// Look up a principal by unique username.
    fn find_by_username(&self, username: &str) -> Result<Option<Principal>, StoreError>;

    /// Insert or overwrite a principal.
    fn persist(&self, principal: &Principal) -> Result<(), StoreError>;

    /// Atomically apply `apply` to the stored principal and return the result.
    ///
    /// Returns `Ok(None)` without calling `apply` when no principal has this
    /// username. A store that detects a lost race instead of preventing it
    /// returns [`StoreError::Conflict`].
    fn update(
        &self,
        username: &str,
        apply: &mut dyn FnMut(&mut Principal),
    ) -> Result<Option<Principal>, StoreError>;
}

impl<S: PrincipalStore + ?Sized> PrincipalStore for std::sync::Arc<S> {
    fn find_by_username(&self, username: &str) -> Result<Option<Principal>, StoreError> {
        (**self).find_by_username(username)
    }

    fn persist(&self, principal: &Principal) -> Result<(), StoreError> {
        (**self).persist(principal)
    }

    fn update(
        &self,
        username: &str,
        apply: &mut dyn FnMut(&mut Principal),
    ) -> Result<Option<Principal>, StoreError> {
        (**self).update(username, apply)
    }
}

/// In-memory principal store keyed by username.
///
/// Suitable for tests and single-instance deployments. [`update`] runs under
/// the write lock, so concurrent transitions on one principal never overwrite
/// each other.
///
/// [`update`]: PrincipalStore::update
#[derive(Debug, Default)]
pub struct MemoryPrincipalStore {
    principals: RwLock<HashMap<String, Principal>>,
}

impl MemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a principal.
    pub fn insert(&self, principal: Principal) -> Result<(), StoreError> {
        self.persist(&principal)
    }

    /// Number of stored principals.
    pub fn len(&self) -> usize {
        self.principals.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PrincipalStore for MemoryPrincipalStore {
    fn find_by_username(&self, username: &str) -> Result<Option<Principal>, StoreError> {
        let principals = self
            .principals
            .read()
            .map_err(|_| StoreError::Unavailable("principal store lock poisoned".into()))?;
        Ok(principals.get(username).cloned())
    }

    fn persist(&self, principal: &Principal) -> Result<(), StoreError> {
        let mut principals = self
            .principals
            .write()
            .map_err(|_| StoreError::Unavailable("principal store lock poisoned".into()))?;
        principals.insert(principal.username.clone(), principal.clone());
        Ok(())
    }

    fn update(
        &self,
        username: &str,
        apply: &mut dyn FnMut(&mut Principal),
    ) -> Result<Option<Principal>, StoreError> {
        let mut principals = self
            .principals
            .write()
            .map_err(|_| StoreError::Unavailable("principal store lock poisoned".into()))?;
        Ok(principals.get_mut(username).map(|principal| {
            apply(principal);
            principal.clone()
        }))
    }
}
