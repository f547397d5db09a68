//! Authentication configuration
//!
//! Provides a builder-pattern configuration for every tunable of the auth core.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::AuthError;
use crate::parse::parse_duration;
use crate::password::HashCost;

/// Configuration for the credential and session authority.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use review_auth::AuthConfig;
///
/// // Or load from environment variables with AuthConfig::from_env()
/// let config = AuthConfig::builder()
///     .access_ttl(Duration::from_secs(15 * 60))
///     .max_login_attempts(3)
///     .build();
///
/// assert_eq!(config.max_login_attempts, 3);
/// ```
#[derive(Clone)]
pub struct AuthConfig {
    /// Token signing secret. `None` means load from `secret_key_file` or generate.
    pub secret_key: Option<String>,

    /// File holding the signing secret across restarts.
    /// Written on first boot when no secret is configured.
    pub secret_key_file: Option<PathBuf>,

    /// Deployment environment name, selects the signing key policy
    pub environment: String,

    /// Lifetime of access tokens
    pub access_ttl: Duration,

    /// Lifetime of refresh tokens
    pub refresh_ttl: Duration,

    /// Consecutive failed logins before the account locks
    pub max_login_attempts: u32,

    /// How long a lock lasts once triggered
    pub lockout_duration: Duration,

    /// Validity window of password reset tokens
    pub password_reset_ttl: Duration,

    /// Argon2 work factor for new hashes
    pub hash_cost: HashCost,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("secret_key_file", &self.secret_key_file)
            .field("environment", &self.environment)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("max_login_attempts", &self.max_login_attempts)
            .field("lockout_duration", &self.lockout_duration)
            .field("password_reset_ttl", &self.password_reset_ttl)
            .field("hash_cost", &self.hash_cost)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            secret_key_file: None,
            environment: "development".to_string(),
            access_ttl: Duration::from_secs(30 * 60),           // 30 minutes
            refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60), // 7 days
            max_login_attempts: 5,
            lockout_duration: Duration::from_secs(30 * 60), // 30 minutes
            password_reset_ttl: Duration::from_secs(60 * 60), // 1 hour
            hash_cost: HashCost::default(),
        }
    }
}

impl AuthConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `AUTH_SECRET_KEY` (or `SECRET_KEY`): token signing secret (default: generated)
    /// - `AUTH_SECRET_KEY_FILE`: where to keep the signing secret across restarts
    /// - `APP_ENV` (or `RUST_ENV`): environment name (default: "development")
    /// - `ACCESS_TOKEN_TTL`: e.g., "30m" (default: "30m")
    /// - `REFRESH_TOKEN_TTL`: e.g., "7d" (default: "7d")
    /// - `MAX_LOGIN_ATTEMPTS`: failures before lockout (default: 5)
    /// - `LOCKOUT_DURATION`: e.g., "30m" (default: "30m")
    /// - `PASSWORD_RESET_TTL`: e.g., "1h" (default: "1h")
    /// - `HASH_MEMORY_KIB`, `HASH_ITERATIONS`, `HASH_PARALLELISM`: Argon2 cost
    ///
    /// Values that fail to parse fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let secret_key = std::env::var("AUTH_SECRET_KEY")
            .or_else(|_| std::env::var("SECRET_KEY"))
            .ok()
            .filter(|s| !s.is_empty());

        let secret_key_file = std::env::var("AUTH_SECRET_KEY_FILE")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let environment = std::env::var("APP_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or(defaults.environment);

        let access_ttl = env_duration("ACCESS_TOKEN_TTL").unwrap_or(defaults.access_ttl);
        let refresh_ttl = env_duration("REFRESH_TOKEN_TTL").unwrap_or(defaults.refresh_ttl);
        let lockout_duration =
            env_duration("LOCKOUT_DURATION").unwrap_or(defaults.lockout_duration);
        let password_reset_ttl =
            env_duration("PASSWORD_RESET_TTL").unwrap_or(defaults.password_reset_ttl);

        let max_login_attempts =
            env_parse("MAX_LOGIN_ATTEMPTS").unwrap_or(defaults.max_login_attempts);

        let hash_cost = HashCost {
            memory_kib: env_parse("HASH_MEMORY_KIB").unwrap_or(defaults.hash_cost.memory_kib),
            iterations: env_parse("HASH_ITERATIONS").unwrap_or(defaults.hash_cost.iterations),
            parallelism: env_parse("HASH_PARALLELISM")
                .unwrap_or(defaults.hash_cost.parallelism),
        };

        Self {
            secret_key,
            secret_key_file,
            environment,
            access_ttl,
            refresh_ttl,
            max_login_attempts,
            lockout_duration,
            password_reset_ttl,
            hash_cost,
        }
    }

    /// Create a new builder for programmatic configuration.
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    /// Reject settings that would break the lockout or token invariants.
    pub fn validate(&self) -> Result<(), AuthError> {
        let non_zero = [
            ("access_ttl", self.access_ttl),
            ("refresh_ttl", self.refresh_ttl),
            ("lockout_duration", self.lockout_duration),
            ("password_reset_ttl", self.password_reset_ttl),
        ];
        for (name, value) in non_zero {
            if value.is_zero() {
                return Err(AuthError::Configuration(format!("{} must be non-zero", name)));
            }
        }

        if self.max_login_attempts == 0 {
            return Err(AuthError::Configuration(
                "max_login_attempts must be at least 1".to_string(),
            ));
        }

        self.hash_cost.params()?;
        Ok(())
    }
}

/// Builder for AuthConfig
#[derive(Debug, Clone, Default)]
pub struct AuthConfigBuilder {
    config: AuthConfig,
}

impl AuthConfigBuilder {
    /// Set the token signing secret.
    pub fn secret_key(mut self, secret: impl Into<String>) -> Self {
        self.config.secret_key = Some(secret.into());
        self
    }

    /// Keep the signing secret in this file (generated on first boot).
    pub fn secret_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.secret_key_file = Some(path.into());
        self
    }

    /// Set the environment name.
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.config.environment = environment.into();
        self
    }

    /// Set access token lifetime.
    pub fn access_ttl(mut self, ttl: Duration) -> Self {
        self.config.access_ttl = ttl;
        self
    }

    /// Set refresh token lifetime.
    pub fn refresh_ttl(mut self, ttl: Duration) -> Self {
        self.config.refresh_ttl = ttl;
        self
    }

    /// Set failures allowed before lockout.
    pub fn max_login_attempts(mut self, attempts: u32) -> Self {
        self.config.max_login_attempts = attempts;
        self
    }

    /// Set lockout duration.
    pub fn lockout_duration(mut self, duration: Duration) -> Self {
        self.config.lockout_duration = duration;
        self
    }

    /// Set password reset token validity.
    pub fn password_reset_ttl(mut self, ttl: Duration) -> Self {
        self.config.password_reset_ttl = ttl;
        self
    }

    /// Set the Argon2 work factor.
    pub fn hash_cost(mut self, cost: HashCost) -> Self {
        self.config.hash_cost = cost;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> AuthConfig {
        self.config
    }
}

/// `now + ttl`, saturating at the largest representable instant.
pub(crate) fn expires_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn env_duration(key: &str) -> Option<Duration> {
    std::env::var(key).ok().and_then(|s| parse_duration(&s))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
