//! Security Event Logging
//!
//! Structured logging for the security-relevant transitions of the auth core,
//! as required by NIST SP 800-53 AU-2 (Audit Events) and AU-3 (Content of
//! Audit Records).
//!
//! Events never carry passwords, password hashes, signing keys, bearer tokens
//! or reset tokens. Usernames are logged.
//!
//! # Usage
//!
//! ```
//! use review_auth::observability::SecurityEvent;
//! use review_auth::security_event;
//!
//! let username = "alice";
//! security_event!(
//!     SecurityEvent::AuthenticationFailure,
//!     username = %username,
//!     failed_count = 3u32,
//!     "Login failed"
//! );
//! ```

use std::fmt;

/// Security event categories for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    // Authentication events
    /// Successful password login
    AuthenticationSuccess,
    /// Failed password login
    AuthenticationFailure,
    /// Bearer or refresh token failed verification
    TokenRejected,
    /// New token pair issued from a refresh token
    TokenRefreshed,

    // Authorization events
    /// Role check passed
    AccessGranted,
    /// Role check failed
    AccessDenied,

    // Account events
    /// Failure threshold reached
    AccountLocked,
    /// Lock cleared by an administrator
    AccountUnlocked,
    /// Reset token issued and handed to the notifier
    PasswordResetRequested,
    /// Stored hash upgraded to the current cost
    PasswordRehashed,

    // System events
    /// No signing secret was configured; one was generated
    SigningKeyGenerated,
}

impl SecurityEvent {
    /// Get the event category for filtering/grouping
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess
            | Self::AuthenticationFailure
            | Self::TokenRejected
            | Self::TokenRefreshed => "authentication",

            Self::AccessGranted | Self::AccessDenied => "authorization",

            Self::AccountLocked
            | Self::AccountUnlocked
            | Self::PasswordResetRequested
            | Self::PasswordRehashed => "account",

            Self::SigningKeyGenerated => "system",
        }
    }

    /// Get the severity level for the event
    pub fn severity(&self) -> Severity {
        match self {
            Self::AccountLocked => Severity::Critical,

            Self::AuthenticationFailure
            | Self::AccessDenied
            | Self::TokenRejected
            | Self::SigningKeyGenerated => Severity::High,

            Self::AuthenticationSuccess
            | Self::AccountUnlocked
            | Self::PasswordResetRequested
            | Self::PasswordRehashed => Severity::Medium,

            Self::AccessGranted | Self::TokenRefreshed => Severity::Low,
        }
    }

    /// Get the event name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::TokenRejected => "token_rejected",
            Self::TokenRefreshed => "token_refreshed",
            Self::AccessGranted => "access_granted",
            Self::AccessDenied => "access_denied",
            Self::AccountLocked => "account_locked",
            Self::AccountUnlocked => "account_unlocked",
            Self::PasswordResetRequested => "password_reset_requested",
            Self::PasswordRehashed => "password_rehashed",
            Self::SigningKeyGenerated => "signing_key_generated",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine operations
    Low,
    /// Important state changes
    Medium,
    /// Security-relevant failures
    High,
    /// Immediate attention required
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Log a security event with structured fields.
///
/// The macro adds `security_event`, `category` and `severity` fields and
/// picks the tracing level from the event's severity: critical → error,
/// high → warn, medium → info, low → debug.
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        let severity = event.severity();
        let category = event.category();
        let event_name = event.name();

        match severity {
            $crate::observability::Severity::Critical => {
                ::tracing::error!(
                    security_event = event_name,
                    category = category,
                    severity = "critical",
                    $($field)*
                );
            }
            $crate::observability::Severity::High => {
                ::tracing::warn!(
                    security_event = event_name,
                    category = category,
                    severity = "high",
                    $($field)*
                );
            }
            $crate::observability::Severity::Medium => {
                ::tracing::info!(
                    security_event = event_name,
                    category = category,
                    severity = "medium",
                    $($field)*
                );
            }
            $crate::observability::Severity::Low => {
                ::tracing::debug!(
                    security_event = event_name,
                    category = category,
                    severity = "low",
                    $($field)*
                );
            }
        }
    }};
}

pub use security_event;
