//! Login Attempt Tracking (AC-7)
//!
//! Consecutive failed-login counting and time-boxed account lockout.
//!
//! The tracker holds no state of its own. Every transition is applied to the
//! lockout fields of a [`Principal`] and the caller persists the result, so a
//! lock survives restarts and is shared by every instance reading the same
//! store.
//!
//! # State Machine
//!
//! ```text
//! Unlocked --failures reach threshold--> Locked
//! Locked   --time elapses-------------> Unlocked (eligible, counter kept)
//! any      --success------------------> Unlocked (counter reset)
//! any      --admin unlock-------------> Unlocked (counter reset)
//! ```
//!
//! An elapsed lock is never cleared by [`LockoutTracker::is_locked`]. The
//! failed-login counter persists until the next success, so the first
//! failure after a lock elapses locks the account again straight away.
//!
//! # Usage
//!
//! ```
//! use chrono::Utc;
//! use review_auth::login::{LockoutPolicy, LockoutTracker};
//! use review_auth::principal::{Principal, Role};
//!
//! let tracker = LockoutTracker::new(LockoutPolicy::default());
//! let mut alice = Principal::new("alice", "alice@example.org", "$argon2id$...", Role::Reviewer);
//! let now = Utc::now();
//!
//! let outcome = tracker.record_failure(&mut alice, now);
//! assert_eq!(outcome.remaining_attempts, 4);
//! assert!(!tracker.is_locked(&alice, now));
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::{expires_after, AuthConfig};
use crate::observability::SecurityEvent;
use crate::principal::Principal;

// ============================================================================
// Lockout Policy (AC-7)
// ============================================================================

/// Shortest lockout window; a lock must always expire in the future.
pub const MIN_LOCKOUT_DURATION: Duration = Duration::from_secs(1);

/// Lockout policy configuration (AC-7)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Number of consecutive failed attempts before lockout
    pub max_attempts: u32,

    /// Duration of lockout once the threshold is reached
    pub lockout_duration: Duration,
}

impl Default for LockoutPolicy {
    /// 5 failed attempts, 30 minute lockout
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_duration: Duration::from_secs(30 * 60),
        }
    }
}

impl LockoutPolicy {
    /// Create a new builder
    pub fn builder() -> LockoutPolicyBuilder {
        LockoutPolicyBuilder::default()
    }

    /// Create policy from the auth configuration
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            max_attempts: config.max_login_attempts,
            lockout_duration: config.lockout_duration,
        }
        .normalized()
    }

    fn normalized(mut self) -> Self {
        self.lockout_duration = self.lockout_duration.max(MIN_LOCKOUT_DURATION);
        self
    }
}

/// Builder for LockoutPolicy
#[derive(Debug, Clone, Default)]
pub struct LockoutPolicyBuilder {
    policy: LockoutPolicy,
}

impl LockoutPolicyBuilder {
    /// Set maximum failed attempts before lockout
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_attempts = attempts;
        self
    }

    /// Set lockout duration
    pub fn lockout_duration(mut self, duration: Duration) -> Self {
        self.policy.lockout_duration = duration;
        self
    }

    /// Build the policy. The window is raised to [`MIN_LOCKOUT_DURATION`].
    pub fn build(self) -> LockoutPolicy {
        self.policy.normalized()
    }
}

// ============================================================================
// Lockout Tracker
// ============================================================================

/// Result of recording a failed login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureOutcome {
    /// Consecutive failures including this one
    pub failed_count: u32,
    /// Failures left before the account locks
    pub remaining_attempts: u32,
    /// Set when this failure locked (or re-locked) the account
    pub locked_until: Option<DateTime<Utc>>,
}

impl FailureOutcome {
    pub fn is_locked_out(&self) -> bool {
        self.locked_until.is_some()
    }
}

/// Applies lockout transitions to principals (AC-7)
#[derive(Debug, Clone, Default)]
pub struct LockoutTracker {
    policy: LockoutPolicy,
}

impl LockoutTracker {
    /// Create a new tracker with the given policy
    pub fn new(policy: LockoutPolicy) -> Self {
        Self {
            policy: policy.normalized(),
        }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Record a failed login.
    ///
    /// Once the counter reaches the threshold every further failure pushes
    /// the lock out to `now + lockout_duration`.
    pub fn record_failure(&self, principal: &mut Principal, now: DateTime<Utc>) -> FailureOutcome {
        principal.failed_login_attempts = principal.failed_login_attempts.saturating_add(1);
        let failed_count = principal.failed_login_attempts;
        let remaining = self.remaining_attempts(principal);

        let locked_until = if failed_count >= self.policy.max_attempts {
            let until = expires_after(now, self.policy.lockout_duration);
            principal.locked_until = Some(until);
            log_account_locked(&principal.username, failed_count, until);
            Some(until)
        } else {
            None
        };

        log_login_failure(&principal.username, failed_count, remaining);

        FailureOutcome {
            failed_count,
            remaining_attempts: remaining,
            locked_until,
        }
    }

    /// Record a successful login: counter and lock cleared, last login stamped.
    pub fn record_success(&self, principal: &mut Principal, now: DateTime<Utc>) {
        principal.failed_login_attempts = 0;
        principal.locked_until = None;
        principal.last_login = Some(now);

        log_login_success(&principal.username);
    }

    /// Whether the principal is locked at `now`. Read-only.
    pub fn is_locked(&self, principal: &Principal, now: DateTime<Utc>) -> bool {
        self.active_lock(principal, now).is_some()
    }

    /// Expiry of the lock in force at `now`, if any.
    pub fn active_lock(&self, principal: &Principal, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        principal.locked_until.filter(|until| now < *until)
    }

    /// Time left on an active lock.
    pub fn remaining(&self, principal: &Principal, now: DateTime<Utc>) -> Option<Duration> {
        self.active_lock(principal, now)
            .and_then(|until| (until - now).to_std().ok())
    }

    /// Failures left before the account locks.
    pub fn remaining_attempts(&self, principal: &Principal) -> u32 {
        self.policy
            .max_attempts
            .saturating_sub(principal.failed_login_attempts)
    }

    /// Manually unlock (admin action). Leaves `last_login` alone.
    pub fn unlock(&self, principal: &mut Principal) {
        principal.failed_login_attempts = 0;
        principal.locked_until = None;

        log_account_unlocked(&principal.username);
    }
}

// ============================================================================
// Security Event Logging (AU-2, AU-3)
// ============================================================================

/// Log successful login
fn log_login_success(username: &str) {
    crate::security_event!(
        SecurityEvent::AuthenticationSuccess,
        username = %username,
        "Login successful"
    );
}

/// Log failed login attempt
fn log_login_failure(username: &str, failed_count: u32, remaining: u32) {
    crate::security_event!(
        SecurityEvent::AuthenticationFailure,
        username = %username,
        failed_count = failed_count,
        remaining_attempts = remaining,
        "Login failed"
    );
}

/// Log account lockout
fn log_account_locked(username: &str, failed_count: u32, until: DateTime<Utc>) {
    crate::security_event!(
        SecurityEvent::AccountLocked,
        username = %username,
        failed_count = failed_count,
        locked_until = %until.to_rfc3339(),
        "Account locked due to failed login attempts"
    );
}

/// Log account unlock
fn log_account_unlocked(username: &str) {
    crate::security_event!(
        SecurityEvent::AccountUnlocked,
        username = %username,
        "Account unlocked"
    );
}

// ============================================================================
// Tests
// ============================================================================
