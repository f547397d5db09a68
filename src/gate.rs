//! Auth Gate (IA-2, AC-3, AC-7)
//!
//! Orchestrates the credential hasher, token service and lockout tracker
//! against the host's [`PrincipalStore`].
//!
//! ```text
//! credentials ──► authenticate ──► hasher.verify ──► lockout update ──► TokenPair
//! bearer      ──► resolve ──► token.verify ──► store lookup ──► active/lock re-check ──► Principal
//! ```
//!
//! Lockout and active state are re-read from the store on every
//! [`resolve`](AuthGate::resolve) and [`refresh`](AuthGate::refresh); a token
//! issued before an account was locked or deactivated stops working as soon
//! as the store says so.
//!
//! # Usage
//!
//! ```
//! use chrono::Utc;
//! use review_auth::gate::AuthGate;
//! use review_auth::password::HashCost;
//! use review_auth::principal::{MemoryPrincipalStore, Principal, Role};
//! use review_auth::AuthConfig;
//!
//! let config = AuthConfig::builder().hash_cost(HashCost::for_tests()).build();
//! let gate = AuthGate::from_config(MemoryPrincipalStore::new(), &config).unwrap();
//!
//! let hash = gate.hasher().hash("s3cret-pass").unwrap();
//! gate.store()
//!     .insert(Principal::new("alice", "alice@example.org", hash, Role::Radiologist))
//!     .unwrap();
//!
//! let now = Utc::now();
//! let pair = gate.authenticate("alice", "s3cret-pass", now).unwrap();
//! let alice = gate.resolve(&pair.access_token, now).unwrap();
//! assert!(gate.authorize(&alice, Role::Radiologist));
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::login::{LockoutPolicy, LockoutTracker};
use crate::observability::SecurityEvent;
use crate::password::PasswordHasher;
use crate::principal::{Principal, PrincipalStore, Role};
use crate::reset::{ResetIssuer, ResetNotifier};
use crate::signing_key::SigningKey;
use crate::token::{TokenError, TokenPair, TokenService};

/// Single entry point for authentication and authorization decisions.
pub struct AuthGate<S> {
    store: S,
    hasher: PasswordHasher,
    tokens: TokenService,
    lockout: LockoutTracker,
    resets: ResetIssuer,
    notifier: Option<Arc<dyn ResetNotifier>>,
}

impl<S> fmt::Debug for AuthGate<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGate")
            .field("hasher", &self.hasher)
            .field("tokens", &self.tokens)
            .field("lockout", &self.lockout)
            .field("resets", &self.resets)
            .field("notifier", &self.notifier.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: PrincipalStore> AuthGate<S> {
    pub fn new(
        store: S,
        hasher: PasswordHasher,
        tokens: TokenService,
        lockout: LockoutTracker,
        resets: ResetIssuer,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
            lockout,
            resets,
            notifier: None,
        }
    }

    /// Validate `config`, resolve the signing key and wire every component.
    pub fn from_config(store: S, config: &AuthConfig) -> Result<Self> {
        config.validate()?;
        let key = SigningKey::resolve(config)?;

        Ok(Self::new(
            store,
            PasswordHasher::new(config.hash_cost),
            TokenService::from_config(&key, config),
            LockoutTracker::new(LockoutPolicy::from_config(config)),
            ResetIssuer::from_config(config),
        ))
    }

    /// Deliver password reset tokens through `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn ResetNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn lockout(&self) -> &LockoutTracker {
        &self.lockout
    }

    /// Exchange a username and password for a token pair.
    ///
    /// Checks run in order: known user, active, not locked, password. A wrong
    /// password is recorded through [`PrincipalStore::update`] before
    /// `Unauthorized` is returned. Unknown users and wrong passwords are
    /// indistinguishable to the caller, including in how long they take.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair> {
        let Some(principal) = self.store.find_by_username(username)? else {
            self.hasher.verify_absent(password);
            log_rejected_login(username, "unknown_user");
            return Err(AuthError::Unauthorized);
        };

        if !principal.is_active {
            log_rejected_login(username, "inactive");
            return Err(AuthError::AccountInactive);
        }

        if let Some(until) = self.lockout.active_lock(&principal, now) {
            log_rejected_login(username, "locked");
            return Err(AuthError::AccountLocked { until });
        }

        let lockout = &self.lockout;

        if !self.hasher.verify(password, &principal.password_hash) {
            self.store.update(username, &mut |p: &mut Principal| {
                lockout.record_failure(p, now);
            })?;
            return Err(AuthError::Unauthorized);
        }

        let upgraded = self.rehash(&principal, password);
        let mut locked_meanwhile = None;
        let updated = self.store.update(username, &mut |p: &mut Principal| {
            // Another request may have locked the account since it was loaded
            if let Some(until) = lockout.active_lock(p, now) {
                locked_meanwhile = Some(until);
                return;
            }
            lockout.record_success(p, now);
            if let Some(hash) = &upgraded {
                if p.password_hash == principal.password_hash {
                    p.password_hash = hash.clone();
                }
            }
        })?;

        if let Some(until) = locked_meanwhile {
            log_rejected_login(username, "locked");
            return Err(AuthError::AccountLocked { until });
        }
        let Some(principal) = updated else {
            log_rejected_login(username, "unknown_user");
            return Err(AuthError::Unauthorized);
        };
        if upgraded.is_some() {
            crate::security_event!(
                SecurityEvent::PasswordRehashed,
                username = %principal.username,
                "Password hash upgraded to current cost"
            );
        }

        self.tokens
            .issue_pair(&principal.username, principal.role, now)
            .map_err(signing_failed)
    }

    /// Turn an access token into the current principal. Read-only.
    pub fn resolve(&self, bearer_token: &str, now: DateTime<Utc>) -> Result<Principal> {
        let claims = self
            .tokens
            .verify_access(bearer_token, now)
            .map_err(|e| reject_token(&e))?;

        let principal = self.load_subject(&claims.sub)?;
        self.check_standing(&principal, now)?;
        Ok(principal)
    }

    /// Exchange a refresh token for a fresh pair. Read-only on the principal.
    pub fn refresh(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<TokenPair> {
        let claims = self
            .tokens
            .verify_refresh(refresh_token, now)
            .map_err(|e| reject_token(&e))?;

        let principal = self.load_subject(&claims.sub)?;
        self.check_standing(&principal, now)?;

        let pair = self
            .tokens
            .issue_pair(&principal.username, principal.role, now)
            .map_err(signing_failed)?;

        crate::security_event!(
            SecurityEvent::TokenRefreshed,
            username = %principal.username,
            "Token pair refreshed"
        );

        Ok(pair)
    }

    /// Exact role match. Pure.
    pub fn authorize(&self, principal: &Principal, required: Role) -> bool {
        principal.role == required
    }

    /// [`authorize`](Self::authorize) with an audit trail and a typed error.
    pub fn require_role(&self, principal: &Principal, required: Role) -> Result<()> {
        if self.authorize(principal, required) {
            crate::security_event!(
                SecurityEvent::AccessGranted,
                username = %principal.username,
                required_role = %required,
                "Access granted"
            );
            Ok(())
        } else {
            crate::security_event!(
                SecurityEvent::AccessDenied,
                username = %principal.username,
                role = %principal.role,
                required_role = %required,
                "Access denied"
            );
            Err(AuthError::Forbidden { required })
        }
    }

    /// Administrative unlock: clears the counter and any lock.
    pub fn unlock(&self, username: &str) -> Result<()> {
        let lockout = &self.lockout;
        self.store
            .update(username, &mut |p: &mut Principal| lockout.unlock(p))?
            .ok_or(AuthError::Unauthorized)?;
        Ok(())
    }

    /// Issue a reset token, store it on the principal and hand it to the
    /// notifier.
    ///
    /// Unknown and inactive users get `Ok(())` with nothing stored or sent.
    pub fn request_password_reset(&self, username: &str, now: DateTime<Utc>) -> Result<()> {
        let reset = self.resets.issue_reset(now);
        let mut stored = false;
        let principal = self.store.update(username, &mut |p: &mut Principal| {
            if p.is_active {
                p.password_reset = Some(reset.clone().into());
                stored = true;
            }
        })?;

        let Some(principal) = principal.filter(|_| stored) else {
            tracing::debug!(username = %username, "Password reset requested for unknown or inactive user");
            return Ok(());
        };

        match &self.notifier {
            Some(notifier) => notifier.notify(&principal, &reset)?,
            None => tracing::warn!(
                username = %username,
                "No reset notifier configured; reset token stored but not delivered"
            ),
        }

        crate::security_event!(
            SecurityEvent::PasswordResetRequested,
            username = %principal.username,
            expires_at = %reset.expires_at.to_rfc3339(),
            "Password reset issued"
        );

        Ok(())
    }

    fn load_subject(&self, subject: &str) -> Result<Principal> {
        self.store.find_by_username(subject)?.ok_or_else(|| {
            crate::security_event!(
                SecurityEvent::TokenRejected,
                username = %subject,
                reason = "unknown_subject",
                "Token subject no longer exists"
            );
            AuthError::Unauthorized
        })
    }

    fn check_standing(&self, principal: &Principal, now: DateTime<Utc>) -> Result<()> {
        if !principal.is_active {
            return Err(AuthError::AccountInactive);
        }
        if let Some(until) = self.lockout.active_lock(principal, now) {
            return Err(AuthError::AccountLocked { until });
        }
        Ok(())
    }

    /// New hash under the current cost if the stored one is outdated.
    /// Failure is logged and the old hash kept.
    fn rehash(&self, principal: &Principal, password: &str) -> Option<String> {
        if !self.hasher.needs_rehash(&principal.password_hash) {
            return None;
        }

        match self.hasher.hash(password) {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::warn!(
                    username = %principal.username,
                    error = %e,
                    "Password rehash failed; keeping existing hash"
                );
                None
            }
        }
    }
}

fn log_rejected_login(username: &str, reason: &'static str) {
    crate::security_event!(
        SecurityEvent::AuthenticationFailure,
        username = %username,
        reason = reason,
        "Login rejected"
    );
}

fn reject_token(err: &TokenError) -> AuthError {
    crate::security_event!(
        SecurityEvent::TokenRejected,
        reason = %err,
        "Token rejected"
    );
    AuthError::Unauthorized
}

fn signing_failed(err: TokenError) -> AuthError {
    AuthError::Configuration(format!("Token signing failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::HashCost;
    use crate::principal::{MemoryPrincipalStore, StoreError};
    use crate::reset::{NotifyError, ResetToken};
    use chrono::TimeDelta;
    use std::sync::{Barrier, Mutex};
    use std::thread;

    const PASSWORD: &str = "correct-password";

    type Gate = AuthGate<Arc<MemoryPrincipalStore>>;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).expect("valid timestamp")
    }

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(HashCost::for_tests())
    }

    fn tokens() -> TokenService {
        TokenService::with_defaults(SigningKey::from_secret(
            "gate-test-key-0b7e2f9c4a61d8352e7f0c9b1a3d5e7f",
        ))
    }

    fn setup() -> (Gate, Arc<MemoryPrincipalStore>) {
        let store = Arc::new(MemoryPrincipalStore::new());
        let hash = hasher().hash(PASSWORD).expect("hash");
        store
            .insert(Principal::new("alice", "alice@example.org", hash, Role::Reviewer))
            .expect("insert");

        let gate = AuthGate::new(
            Arc::clone(&store),
            hasher(),
            tokens(),
            LockoutTracker::default(),
            ResetIssuer::default(),
        );
        (gate, store)
    }

    fn load(store: &MemoryPrincipalStore, username: &str) -> Principal {
        store
            .find_by_username(username)
            .expect("find")
            .expect("present")
    }

    #[test]
    fn test_authenticate_success() {
        let (gate, store) = setup();
        let pair = gate.authenticate("alice", PASSWORD, t(0)).expect("login");

        assert_eq!(pair.token_type, "bearer");
        let claims = gate.tokens().verify_access(&pair.access_token, t(0)).expect("access");
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, Some(Role::Reviewer));

        let alice = load(&store, "alice");
        assert_eq!(alice.last_login, Some(t(0)));
        assert_eq!(alice.failed_login_attempts, 0);
    }

    #[test]
    fn test_unknown_user_and_wrong_password_look_the_same() {
        let (gate, _) = setup();
        let unknown = gate.authenticate("mallory", PASSWORD, t(0)).unwrap_err();
        let wrong = gate.authenticate("alice", "wrong", t(0)).unwrap_err();

        assert!(matches!(unknown, AuthError::Unauthorized));
        assert!(matches!(wrong, AuthError::Unauthorized));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[test]
    fn test_wrong_password_is_persisted() {
        let (gate, store) = setup();
        assert!(gate.authenticate("alice", "wrong", t(0)).is_err());
        assert!(gate.authenticate("alice", "wrong", t(1)).is_err());

        assert_eq!(load(&store, "alice").failed_login_attempts, 2);
    }

    #[test]
    fn test_inactive_user() {
        let (gate, store) = setup();
        let mut alice = load(&store, "alice");
        alice.is_active = false;
        store.persist(&alice).expect("persist");

        assert!(matches!(
            gate.authenticate("alice", PASSWORD, t(0)),
            Err(AuthError::AccountInactive)
        ));
    }

    #[test]
    fn test_lockout_scenario() {
        let (gate, store) = setup();

        for i in 0..5 {
            assert!(matches!(
                gate.authenticate("alice", "wrong", t(i)),
                Err(AuthError::Unauthorized)
            ));
        }
        assert_eq!(load(&store, "alice").locked_until, Some(t(4 + 1800)));

        match gate.authenticate("alice", PASSWORD, t(100)) {
            Err(AuthError::AccountLocked { until }) => assert_eq!(until, t(1804)),
            other => panic!("expected AccountLocked, got {:?}", other),
        }
        // Rejected while locked: counter untouched
        assert_eq!(load(&store, "alice").failed_login_attempts, 5);

        assert!(gate.authenticate("alice", PASSWORD, t(1805)).is_ok());
        let alice = load(&store, "alice");
        assert_eq!(alice.failed_login_attempts, 0);
        assert!(alice.locked_until.is_none());
    }

    fn concurrent_wrong_passwords(gate: &Gate, threads: usize, now: DateTime<Utc>) -> Vec<AuthError> {
        let barrier = Barrier::new(threads);
        thread::scope(|scope| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        gate.authenticate("alice", "wrong", now).unwrap_err()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().expect("join"))
                .collect()
        })
    }

    #[test]
    fn test_concurrent_failures_are_all_counted() {
        let (_, store) = setup();
        let gate = AuthGate::new(
            Arc::clone(&store),
            hasher(),
            tokens(),
            LockoutTracker::new(LockoutPolicy::builder().max_attempts(100).build()),
            ResetIssuer::default(),
        );

        let errors = concurrent_wrong_passwords(&gate, 10, t(0));

        assert!(errors.iter().all(|e| matches!(e, AuthError::Unauthorized)));
        assert_eq!(load(&store, "alice").failed_login_attempts, 10);
    }

    #[test]
    fn test_concurrent_failures_lock_the_account() {
        let (gate, store) = setup();

        let errors = concurrent_wrong_passwords(&gate, 10, t(0));

        // Requests that arrive after the lock is set are rejected unrecorded
        let recorded = errors
            .iter()
            .filter(|e| matches!(e, AuthError::Unauthorized))
            .count();
        let alice = load(&store, "alice");
        assert!(recorded >= 5);
        assert_eq!(alice.failed_login_attempts as usize, recorded);
        assert_eq!(alice.locked_until, Some(t(1800)));
        assert!(matches!(
            gate.authenticate("alice", PASSWORD, t(1)),
            Err(AuthError::AccountLocked { .. })
        ));
    }

    #[test]
    fn test_unknown_user_still_pays_for_a_hash() {
        let (gate, _) = setup();
        assert!(matches!(
            gate.authenticate("mallory", "guess", t(0)),
            Err(AuthError::Unauthorized)
        ));
        assert!(!gate.hasher().verify_absent("guess"));
    }

    #[test]
    fn test_four_failures_do_not_lock() {
        let (gate, _) = setup();
        for i in 0..4 {
            let _ = gate.authenticate("alice", "wrong", t(i));
        }
        assert!(gate.authenticate("alice", PASSWORD, t(5)).is_ok());
    }

    #[test]
    fn test_resolve() {
        let (gate, _) = setup();
        let pair = gate.authenticate("alice", PASSWORD, t(0)).expect("login");
        let alice = gate.resolve(&pair.access_token, t(60)).expect("resolve");
        assert_eq!(alice.username, "alice");
    }

    #[test]
    fn test_resolve_rechecks_lockout() {
        let (gate, store) = setup();
        let pair = gate.authenticate("alice", PASSWORD, t(0)).expect("login");

        for i in 1..=5 {
            let _ = gate.authenticate("alice", "wrong", t(i));
        }

        assert!(matches!(
            gate.resolve(&pair.access_token, t(10)),
            Err(AuthError::AccountLocked { .. })
        ));

        // Same token works again once an admin clears the lock
        gate.unlock("alice").expect("unlock");
        assert!(gate.resolve(&pair.access_token, t(11)).is_ok());
        assert_eq!(load(&store, "alice").failed_login_attempts, 0);
    }

    #[test]
    fn test_resolve_rechecks_active_flag() {
        let (gate, store) = setup();
        let pair = gate.authenticate("alice", PASSWORD, t(0)).expect("login");

        let mut alice = load(&store, "alice");
        alice.is_active = false;
        store.persist(&alice).expect("persist");

        assert!(matches!(
            gate.resolve(&pair.access_token, t(1)),
            Err(AuthError::AccountInactive)
        ));
    }

    #[test]
    fn test_resolve_collapses_token_errors() {
        let (gate, _) = setup();
        let pair = gate.authenticate("alice", PASSWORD, t(0)).expect("login");

        for token in ["", "garbage", pair.refresh_token.as_str()] {
            assert!(matches!(gate.resolve(token, t(0)), Err(AuthError::Unauthorized)));
        }
        assert!(matches!(
            gate.resolve(&pair.access_token, t(1800)),
            Err(AuthError::Unauthorized)
        ));
    }

    #[test]
    fn test_resolve_unknown_subject() {
        let (gate, _) = setup();
        let token = gate
            .tokens()
            .issue_access("ghost", Role::Admin, t(0))
            .expect("issue");
        assert!(matches!(gate.resolve(&token, t(0)), Err(AuthError::Unauthorized)));
    }

    #[test]
    fn test_role_from_store_not_token() {
        let (gate, store) = setup();
        let pair = gate.authenticate("alice", PASSWORD, t(0)).expect("login");

        let mut alice = load(&store, "alice");
        alice.role = Role::Admin;
        store.persist(&alice).expect("persist");

        let resolved = gate.resolve(&pair.access_token, t(1)).expect("resolve");
        assert!(gate.authorize(&resolved, Role::Admin));
        assert!(!gate.authorize(&resolved, Role::Reviewer));
    }

    #[test]
    fn test_require_role() {
        let (gate, store) = setup();
        let alice = load(&store, "alice");

        assert!(gate.require_role(&alice, Role::Reviewer).is_ok());
        assert!(matches!(
            gate.require_role(&alice, Role::Admin),
            Err(AuthError::Forbidden { required: Role::Admin })
        ));
    }

    #[test]
    fn test_refresh() {
        let (gate, _) = setup();
        let pair = gate.authenticate("alice", PASSWORD, t(0)).expect("login");

        let fresh = gate.refresh(&pair.refresh_token, t(3600)).expect("refresh");
        assert!(gate.resolve(&fresh.access_token, t(3600)).is_ok());

        // An access token is not a refresh token
        assert!(matches!(
            gate.refresh(&pair.access_token, t(0)),
            Err(AuthError::Unauthorized)
        ));
    }

    #[test]
    fn test_refresh_rechecks_lockout() {
        let (gate, _) = setup();
        let pair = gate.authenticate("alice", PASSWORD, t(0)).expect("login");
        for i in 1..=5 {
            let _ = gate.authenticate("alice", "wrong", t(i));
        }
        assert!(matches!(
            gate.refresh(&pair.refresh_token, t(10)),
            Err(AuthError::AccountLocked { .. })
        ));
    }

    #[test]
    fn test_unlock_unknown_user() {
        let (gate, _) = setup();
        assert!(matches!(gate.unlock("nobody"), Err(AuthError::Unauthorized)));
    }

    #[test]
    fn test_outdated_hash_is_upgraded() {
        let (gate, store) = setup();
        let old = PasswordHasher::new(HashCost {
            iterations: 2,
            ..HashCost::for_tests()
        });
        let mut alice = load(&store, "alice");
        alice.password_hash = old.hash(PASSWORD).expect("hash");
        store.persist(&alice).expect("persist");
        assert!(gate.hasher().needs_rehash(&alice.password_hash));

        gate.authenticate("alice", PASSWORD, t(0)).expect("login");

        let upgraded = load(&store, "alice").password_hash;
        assert_ne!(upgraded, alice.password_hash);
        assert!(!gate.hasher().needs_rehash(&upgraded));
        assert!(gate.authenticate("alice", PASSWORD, t(1)).is_ok());
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl ResetNotifier for RecordingNotifier {
        fn notify(&self, principal: &Principal, reset: &ResetToken) -> std::result::Result<(), NotifyError> {
            self.sent
                .lock()
                .expect("lock")
                .push((principal.email.clone(), reset.token.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_request_password_reset() {
        let (gate, store) = setup();
        let notifier = Arc::new(RecordingNotifier::default());
        let gate = gate.with_notifier(notifier.clone());

        gate.request_password_reset("alice", t(0)).expect("reset");

        let sent = notifier.sent.lock().expect("lock").clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "alice@example.org");

        let stored = load(&store, "alice").password_reset.expect("stored");
        assert_eq!(stored.expires_at, t(0) + TimeDelta::hours(1));
        assert!(stored.is_valid_for(&sent[0].1, t(3599)));
        assert!(!stored.is_valid_for(&sent[0].1, t(3600)));
    }

    #[test]
    fn test_password_reset_for_unknown_or_inactive_is_silent() {
        let (gate, store) = setup();
        let notifier = Arc::new(RecordingNotifier::default());
        let gate = gate.with_notifier(notifier.clone());

        let mut bob = Principal::new("bob", "bob@example.org", "h", Role::Technician);
        bob.is_active = false;
        store.insert(bob).expect("insert");

        assert!(gate.request_password_reset("nobody", t(0)).is_ok());
        assert!(gate.request_password_reset("bob", t(0)).is_ok());
        assert!(notifier.sent.lock().expect("lock").is_empty());
        assert!(load(&store, "bob").password_reset.is_none());
    }

    struct FailingNotifier;

    impl ResetNotifier for FailingNotifier {
        fn notify(&self, _: &Principal, _: &ResetToken) -> std::result::Result<(), NotifyError> {
            Err(NotifyError("smtp unreachable".into()))
        }
    }

    #[test]
    fn test_notifier_failure_propagates() {
        let (gate, _) = setup();
        let gate = gate.with_notifier(Arc::new(FailingNotifier));
        assert!(matches!(
            gate.request_password_reset("alice", t(0)),
            Err(AuthError::Notification(_))
        ));
    }

    /// Reads succeed, writes fail.
    struct ReadOnlyStore(MemoryPrincipalStore);

    impl PrincipalStore for ReadOnlyStore {
        fn find_by_username(&self, username: &str) -> std::result::Result<Option<Principal>, StoreError> {
            self.0.find_by_username(username)
        }

        fn persist(&self, _: &Principal) -> std::result::Result<(), StoreError> {
            Err(StoreError::Unavailable("read-only replica".into()))
        }

        fn update(
            &self,
            _: &str,
            _: &mut dyn FnMut(&mut Principal),
        ) -> std::result::Result<Option<Principal>, StoreError> {
            Err(StoreError::Unavailable("read-only replica".into()))
        }
    }

    #[test]
    fn test_store_errors_propagate() {
        let inner = MemoryPrincipalStore::new();
        inner
            .insert(Principal::new(
                "alice",
                "alice@example.org",
                hasher().hash(PASSWORD).expect("hash"),
                Role::Admin,
            ))
            .expect("insert");
        let gate = AuthGate::new(
            ReadOnlyStore(inner),
            hasher(),
            tokens(),
            LockoutTracker::default(),
            ResetIssuer::default(),
        );

        assert!(matches!(
            gate.authenticate("alice", "wrong", t(0)),
            Err(AuthError::Store(StoreError::Unavailable(_)))
        ));
        assert!(matches!(
            gate.authenticate("alice", PASSWORD, t(0)),
            Err(AuthError::Store(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let config = AuthConfig::builder()
            .hash_cost(HashCost::for_tests())
            .max_login_attempts(2)
            .build();
        let gate = AuthGate::from_config(MemoryPrincipalStore::new(), &config).expect("gate");
        let hash = gate.hasher().hash(PASSWORD).expect("hash");
        gate.store()
            .insert(Principal::new("carol", "c@example.org", hash, Role::Radiologist))
            .expect("insert");

        let _ = gate.authenticate("carol", "wrong", t(0));
        let _ = gate.authenticate("carol", "wrong", t(1));
        assert!(matches!(
            gate.authenticate("carol", PASSWORD, t(2)),
            Err(AuthError::AccountLocked { .. })
        ));
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = AuthConfig::builder().max_login_attempts(0).build();
        assert!(matches!(
            AuthGate::from_config(MemoryPrincipalStore::new(), &config),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn test_gate_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthGate<MemoryPrincipalStore>>();
    }
}
