//! # review-auth
//!
//! Credential and session authority for the clinical review service.
//!
//! Authenticates users by password, issues time-bounded bearer tokens,
//! locks accounts after repeated failed logins and answers role checks.
//! Principals live in the host's user store and are reached only through
//! the [`PrincipalStore`] trait.
//!
//! ## Components
//!
//! - **Credential Hasher** (IA-5(1)): Argon2id with an upgradeable cost, [`password`]
//! - **Token Service** (IA-2, SC-23): HS256 access and refresh tokens, [`token`]
//! - **Lockout Tracker** (AC-7): consecutive-failure lockout, [`login`]
//! - **Auth Gate**: authenticate, resolve, refresh and authorize, [`gate`]
//! - **Password Reset Issuer**: single-use reset tokens, [`reset`]
//! - **Structured Logging** (AU-2, AU-3): security events via tracing, [`observability`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use review_auth::{AuthConfig, AuthGate};
//! use review_auth::observability::{init, ObservabilityConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init(ObservabilityConfig::from_env())?;
//!
//!     let config = AuthConfig::from_env();
//!     let gate = Arc::new(AuthGate::from_config(MyUserStore::connect()?, &config)?);
//!
//!     // Route login to gate.authenticate, protect the API with
//!     // review_auth::http::require_principal ...
//!     Ok(())
//! }
//! ```
//!
//! Every time-dependent operation takes the current instant as a parameter;
//! nothing in the crate reads the wall clock except the HTTP middleware.

pub mod config;
pub mod crypto;
pub mod error;
pub mod gate;
#[cfg(feature = "axum")]
pub mod http;
pub mod login;
pub mod observability;
pub mod parse;
pub mod password;
pub mod principal;
pub mod reset;
pub mod signing_key;
pub mod token;

// Re-exports
pub use config::{AuthConfig, AuthConfigBuilder};
pub use crypto::constant_time_str_eq;
pub use error::{AuthError, Result};
pub use gate::AuthGate;
pub use login::{FailureOutcome, LockoutPolicy, LockoutTracker};
pub use parse::parse_duration;
pub use password::{HashCost, PasswordHasher};
pub use principal::{MemoryPrincipalStore, Principal, PrincipalStore, Role, StoreError};
pub use reset::{NotifyError, ResetIssuer, ResetNotifier, ResetToken};
pub use signing_key::{SigningKey, SigningKeyPolicy};
pub use token::{Claims, TokenError, TokenPair, TokenService, TokenType};
