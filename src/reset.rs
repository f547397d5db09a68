//! Password reset tokens
//!
//! Single-use, high-entropy tokens with a fixed validity window. Issuance is
//! pure; storing the token on the principal and delivering it to the user
//! are done by [`AuthGate::request_password_reset`](crate::gate::AuthGate::request_password_reset)
//! through the [`ResetNotifier`] seam.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::{expires_after, AuthConfig};
use crate::crypto::random_token;
use crate::principal::{PasswordReset, Principal};

/// Bytes of OS randomness per token (43 URL-safe characters)
const TOKEN_BYTES: usize = 32;

/// A freshly issued reset token.
#[derive(Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for ResetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl From<ResetToken> for PasswordReset {
    fn from(reset: ResetToken) -> Self {
        PasswordReset {
            token: reset.token,
            expires_at: reset.expires_at,
        }
    }
}

/// Issues password reset tokens.
#[derive(Debug, Clone)]
pub struct ResetIssuer {
    ttl: Duration,
}

impl Default for ResetIssuer {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60))
    }
}

impl ResetIssuer {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.password_reset_ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token valid until `now + ttl`.
    pub fn issue_reset(&self, now: DateTime<Utc>) -> ResetToken {
        ResetToken {
            token: random_token(TOKEN_BYTES),
            expires_at: expires_after(now, self.ttl),
        }
    }
}

/// Delivery of a reset token failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct NotifyError(pub String);

/// Delivers reset tokens to their owner (email, SMS, ...).
pub trait ResetNotifier: Send + Sync {
    fn notify(&self, principal: &Principal, reset: &ResetToken) -> Result<(), NotifyError>;
}
