//! Authentication Errors (SI-11)
//!
//! One error type for every operation of the auth gate, with kinds callers
//! branch on instead of inspecting messages.
//!
//! # Information Leakage
//!
//! `Unauthorized` deliberately covers unknown users, wrong passwords and
//! unusable bearer tokens alike. The precise reason is logged as a security
//! event but never returned, so a client cannot probe which check failed.

use chrono::{DateTime, Utc};

use crate::principal::{Role, StoreError};
use crate::reset::NotifyError;
use crate::token::TokenError;

/// Errors returned by the auth core.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Bad credentials, unknown user, or an unresolvable bearer token
    #[error("Could not validate credentials")]
    Unauthorized,

    /// The account exists but has been deactivated
    #[error("Inactive user")]
    AccountInactive,

    /// The account is locked after repeated failed logins
    #[error("Account is locked until {until}")]
    AccountLocked {
        /// When the lock elapses
        until: DateTime<Utc>,
    },

    /// Authenticated, but the principal lacks the required role
    #[error("Role '{required}' required")]
    Forbidden {
        /// The role the operation demands
        required: Role,
    },

    /// Token verification failed; collapsed to `Unauthorized` by the gate
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    /// The external principal store failed
    #[error("Principal store error: {0}")]
    Store(#[from] StoreError),

    /// Password reset delivery failed
    #[error("Reset notification failed: {0}")]
    Notification(#[from] NotifyError),

    /// Password hashing failed
    #[error("{0}")]
    Hashing(String),

    /// Invalid configuration or key material
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized | Self::InvalidToken(_) => "unauthorized",
            Self::AccountInactive => "account_inactive",
            Self::AccountLocked { .. } => "account_locked",
            Self::Forbidden { .. } => "forbidden",
            Self::Store(_) | Self::Notification(_) | Self::Hashing(_) => "internal_error",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// Whether the caller caused this error, as opposed to a fault on our side.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized
                | Self::InvalidToken(_)
                | Self::AccountInactive
                | Self::AccountLocked { .. }
                | Self::Forbidden { .. }
        )
    }
}

/// Result type alias for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;
