//! Token Signing Key Lifecycle (IA-5, SC-12)
//!
//! The HMAC key that signs bearer tokens is resolved once at startup and
//! injected into [`TokenService`](crate::token::TokenService). Resolution order:
//!
//! 1. an explicitly configured secret, checked against [`SigningKeyPolicy`]
//! 2. a key file, read if present, otherwise generated and written on first boot
//! 3. a freshly generated key that lives only as long as the process
//!
//! The key is never rotated by this crate. Rotation is an operational task:
//! replace the secret or key file and restart.
//!
//! # Example
//!
//! ```
//! use review_auth::signing_key::{SigningKey, SigningKeyPolicy};
//!
//! let policy = SigningKeyPolicy::for_environment("production");
//! assert!(policy.validate("my-secret-key").is_err());
//!
//! let key = SigningKey::generate();
//! assert_eq!(key.as_bytes().len(), 64);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::AuthConfig;
use crate::observability::SecurityEvent;

/// Length of generated secrets, in characters
const GENERATED_LENGTH: usize = 64;

/// Error type for signing key resolution failures.
#[derive(Debug, Clone, PartialEq)]
pub enum SigningKeyError {
    /// Secret is too short for the environment
    TooShort {
        actual: usize,
        minimum: usize,
        context: String,
    },
    /// Secret contains a weak/common pattern
    WeakPattern { pattern: String },
    /// Secret has insufficient entropy
    LowEntropy {
        actual: f64,
        minimum: f64,
        context: String,
    },
    /// Key file could not be read or written
    Io { path: PathBuf, message: String },
}

impl fmt::Display for SigningKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort {
                actual,
                minimum,
                context,
            } => write!(
                f,
                "Signing secret length ({} chars) is below minimum ({} chars) for {}",
                actual, minimum, context
            ),
            Self::WeakPattern { pattern } => {
                write!(f, "Signing secret contains weak pattern: '{}'", pattern)
            }
            Self::LowEntropy {
                actual,
                minimum,
                context,
            } => write!(
                f,
                "Signing secret entropy ({:.1} bits) is below minimum ({:.1} bits) for {}",
                actual, minimum, context
            ),
            Self::Io { path, message } => {
                write!(f, "Signing key file {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for SigningKeyError {}

impl From<SigningKeyError> for crate::error::AuthError {
    fn from(err: SigningKeyError) -> Self {
        crate::error::AuthError::Configuration(err.to_string())
    }
}

/// Requirements a configured signing secret must meet.
#[derive(Debug, Clone)]
pub struct SigningKeyPolicy {
    /// Minimum secret length in characters
    pub min_length: usize,
    /// Minimum Shannon entropy in bits
    pub min_entropy: f64,
    /// Whether to check for weak patterns
    pub check_weak_patterns: bool,
    /// Context string for error messages
    pub context: String,
}

impl Default for SigningKeyPolicy {
    fn default() -> Self {
        Self::for_environment("development")
    }
}

impl SigningKeyPolicy {
    /// Create a policy for a specific environment.
    ///
    /// - `production`: 64 char min, 128-bit entropy
    /// - `staging`: 48 char min, 96-bit entropy
    /// - anything else: 32 char min, 32-bit entropy
    pub fn for_environment(environment: &str) -> Self {
        match environment.to_lowercase().as_str() {
            "production" | "prod" => Self {
                min_length: 64,
                min_entropy: 128.0,
                check_weak_patterns: true,
                context: "production environment".to_string(),
            },
            "staging" | "stage" => Self {
                min_length: 48,
                min_entropy: 96.0,
                check_weak_patterns: true,
                context: "staging environment".to_string(),
            },
            _ => Self {
                min_length: 32,
                min_entropy: 32.0,
                check_weak_patterns: true,
                context: format!("{} environment", environment),
            },
        }
    }

    /// Validate a secret against this policy.
    pub fn validate(&self, secret: &str) -> Result<(), SigningKeyError> {
        if secret.len() < self.min_length {
            return Err(SigningKeyError::TooShort {
                actual: secret.len(),
                minimum: self.min_length,
                context: self.context.clone(),
            });
        }

        if self.check_weak_patterns {
            if let Some(pattern) = find_weak_pattern(secret) {
                return Err(SigningKeyError::WeakPattern {
                    pattern: pattern.to_string(),
                });
            }
        }

        let entropy = calculate_entropy(secret);
        if entropy < self.min_entropy {
            return Err(SigningKeyError::LowEntropy {
                actual: entropy,
                minimum: self.min_entropy,
                context: self.context.clone(),
            });
        }

        Ok(())
    }
}

/// Where a signing key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// Supplied by configuration
    Configured,
    /// Read from the key file
    File,
    /// Generated and written to the key file this boot
    GeneratedPersisted,
    /// Generated in memory; tokens will not survive a restart
    GeneratedEphemeral,
}

/// Process-wide token signing secret. Set once, read-only thereafter.
#[derive(Clone)]
pub struct SigningKey {
    secret: Vec<u8>,
    origin: KeyOrigin,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("secret", &"[REDACTED]")
            .field("origin", &self.origin)
            .finish()
    }
}

impl SigningKey {
    /// Wrap an existing secret without policy checks.
    pub fn from_secret(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            origin: KeyOrigin::Configured,
        }
    }

    /// Generate a fresh random secret held only in memory.
    pub fn generate() -> Self {
        Self {
            secret: generate_secret(GENERATED_LENGTH).into_bytes(),
            origin: KeyOrigin::GeneratedEphemeral,
        }
    }

    /// Read the key from `path`, or generate one and write it there.
    ///
    /// The file is created with owner-only permissions on unix. If another
    /// process wins the race to create it, its key is read back instead.
    pub fn load_or_generate(path: &Path) -> Result<Self, SigningKeyError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let secret = contents.trim();
                if secret.is_empty() {
                    return Err(io_error(path, "key file is empty"));
                }
                return Ok(Self {
                    secret: secret.as_bytes().to_vec(),
                    origin: KeyOrigin::File,
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(path, &e.to_string())),
        }

        let secret = generate_secret(GENERATED_LENGTH);
        match create_private_file(path) {
            Ok(mut file) => {
                file.write_all(secret.as_bytes())
                    .and_then(|_| file.sync_all())
                    .map_err(|e| io_error(path, &e.to_string()))?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Self::load_or_generate(path);
            }
            Err(e) => return Err(io_error(path, &e.to_string())),
        }

        crate::security_event!(
            SecurityEvent::SigningKeyGenerated,
            path = %path.display(),
            persisted = true,
            "Generated token signing key"
        );

        Ok(Self {
            secret: secret.into_bytes(),
            origin: KeyOrigin::GeneratedPersisted,
        })
    }

    /// Resolve the key for this process from configuration.
    pub fn resolve(config: &AuthConfig) -> Result<Self, SigningKeyError> {
        if let Some(secret) = &config.secret_key {
            SigningKeyPolicy::for_environment(&config.environment).validate(secret)?;
            return Ok(Self::from_secret(secret));
        }

        if let Some(path) = &config.secret_key_file {
            return Self::load_or_generate(path);
        }

        crate::security_event!(
            SecurityEvent::SigningKeyGenerated,
            persisted = false,
            "Generated ephemeral token signing key; tokens will not survive a restart"
        );
        Ok(Self::generate())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.secret
    }

    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }
}

/// Generate a random secret from a printable alphabet.
fn generate_secret(length: usize) -> String {
    use rand::Rng;

    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()_+-=[]{}|;:,.<>?/~";

    let mut rng = rand::rngs::OsRng;
    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

fn find_weak_pattern(secret: &str) -> Option<&'static str> {
    const WEAK_PATTERNS: &[&str] = &[
        "secret", "password", "admin", "123456", "qwerty", "default", "example", "changeme",
        "letmein", "welcome",
    ];

    let secret_lower = secret.to_lowercase();
    WEAK_PATTERNS
        .iter()
        .find(|pattern| secret_lower.contains(*pattern))
        .copied()
}

/// Total Shannon entropy of a string in bits (per-char entropy × length).
pub fn calculate_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut char_counts: HashMap<char, usize> = HashMap::new();
    let total = s.chars().count() as f64;

    for c in s.chars() {
        *char_counts.entry(c).or_insert(0) += 1;
    }

    let per_char: f64 = char_counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum();

    per_char * total
}

fn io_error(path: &Path, message: &str) -> SigningKeyError {
    SigningKeyError::Io {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

#[cfg(unix)]
fn create_private_file(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private_file(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new().write(true).create_new(true).open(path)
}
