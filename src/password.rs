//! Credential Hashing (IA-5(1))
//!
//! One-way password hashing with Argon2id and a tunable work factor.
//!
//! Hashes are stored as PHC strings, which carry their own parameters, so
//! raising the configured cost never invalidates existing credentials.
//! [`PasswordHasher::needs_rehash`] reports hashes produced under an older
//! cost so they can be upgraded on the next successful login.
//!
//! # Usage
//!
//! ```
//! use review_auth::password::{HashCost, PasswordHasher};
//!
//! let hasher = PasswordHasher::new(HashCost::for_tests());
//! let hash = hasher.hash("correct horse battery staple").unwrap();
//!
//! assert!(hasher.verify("correct horse battery staple", &hash));
//! assert!(!hasher.verify("Tr0ub4dor&3", &hash));
//! ```

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use std::sync::OnceLock;

use crate::crypto::random_token;
use crate::error::AuthError;

/// Argon2id work factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashCost {
    /// OWASP baseline for Argon2id: 19 MiB, 2 passes, 1 lane
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashCost {
    /// Smallest parameters Argon2 accepts. Never use outside tests.
    pub fn for_tests() -> Self {
        Self {
            memory_kib: Params::MIN_M_COST,
            iterations: 1,
            parallelism: 1,
        }
    }

    pub(crate) fn params(&self) -> Result<Params, AuthError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| AuthError::Configuration(format!("Invalid hash cost: {}", e)))
    }
}

/// Salted, deliberately slow password hashing.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: HashCost,
    /// Hash of a throwaway password under `cost`, built on first use
    dummy_hash: OnceLock<String>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(HashCost::default())
    }
}

impl PasswordHasher {
    pub fn new(cost: HashCost) -> Self {
        Self {
            cost,
            dummy_hash: OnceLock::new(),
        }
    }

    /// The work factor applied to new hashes.
    pub fn cost(&self) -> HashCost {
        self.cost
    }

    /// Hash a password with a fresh random salt.
    ///
    /// Returns a PHC-formatted string (`$argon2id$v=19$m=...`).
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.cost.params()?);
        let salt = SaltString::generate(&mut OsRng);

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(format!("Failed to hash password: {}", e)))
    }

    /// Check a candidate password against a stored hash.
    ///
    /// The stored hash's own parameters are used. A malformed or unsupported
    /// hash verifies as `false`.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            tracing::warn!("Stored password hash is malformed; rejecting credential");
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Spend the same work as [`verify`](Self::verify) against a real hash,
    /// then reject. Used when there is no stored hash to check, so that the
    /// response time does not reveal whether the account exists.
    pub fn verify_absent(&self, password: &str) -> bool {
        let dummy = self
            .dummy_hash
            .get_or_init(|| self.hash(&random_token(16)).unwrap_or_default());
        let _ = self.verify(password, dummy);
        false
    }

    /// Whether a stored hash was produced with a different algorithm or cost
    /// than the one currently configured.
    pub fn needs_rehash(&self, stored_hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored_hash) else {
            return true;
        };

        if parsed.algorithm != argon2::ARGON2ID_IDENT {
            return true;
        }

        match Params::try_from(&parsed) {
            Ok(params) => {
                params.m_cost() != self.cost.memory_kib
                    || params.t_cost() != self.cost.iterations
                    || params.p_cost() != self.cost.parallelism
            }
            Err(_) => true,
        }
    }
}
