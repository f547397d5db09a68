//! Bearer Token Service (IA-2, SC-23)
//!
//! Issues and verifies HS256-signed JWTs for access and refresh.
//!
//! # Claims
//!
//! | Claim  | Access | Refresh | Meaning                         |
//! |--------|--------|---------|---------------------------------|
//! | `sub`  | yes    | yes     | principal username              |
//! | `role` | yes    | no      | role at issuance (informational)|
//! | `typ`  | access | refresh | token type marker               |
//! | `iat`  | yes    | yes     | issued-at, unix seconds         |
//! | `exp`  | yes    | yes     | expiry, unix seconds            |
//!
//! Every claim sits inside the signed payload. Expiry is checked against a
//! caller-supplied `now`, never the wall clock, so verification is a pure
//! function of `(token, key, now)`.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use review_auth::principal::Role;
//! use review_auth::signing_key::SigningKey;
//! use review_auth::token::TokenService;
//!
//! let service = TokenService::with_defaults(SigningKey::generate());
//! let now = Utc::now();
//!
//! let token = service.issue_access("alice", Role::Reviewer, now).unwrap();
//! let claims = service.verify_access(&token, now).unwrap();
//! assert_eq!(claims.sub, "alice");
//! ```

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::{expires_after, AuthConfig};
use crate::principal::Role;
use crate::signing_key::SigningKey;

/// Token type marker carried in the `typ` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => f.write_str("access"),
            Self::Refresh => f.write_str("refresh"),
        }
    }
}

/// Signed token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub typ: TokenType,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Whether these claims have expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Why a token failed verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Signature does not match the payload under our key
    #[error("bad signature")]
    BadSignature,
    /// Not a well-formed token for this service
    #[error("malformed token")]
    Malformed,
    /// Signature fine, but `now >= exp`
    #[error("token expired")]
    Expired,
    /// A refresh token presented where an access token is required, or vice versa
    #[error("expected {expected} token, got {found}")]
    WrongType {
        expected: TokenType,
        found: TokenType,
    },
    /// Signing failed while issuing
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Access and refresh token issued together on login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `"bearer"`
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

/// Issues and verifies signed, expiring tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("key", &"[REDACTED]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl TokenService {
    /// Create a service that signs with `key`.
    pub fn new(key: &SigningKey, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(key.as_bytes()),
            decoding_key: DecodingKey::from_secret(key.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// 30 minute access tokens, 7 day refresh tokens.
    pub fn with_defaults(key: SigningKey) -> Self {
        let defaults = AuthConfig::default();
        Self::new(&key, defaults.access_ttl, defaults.refresh_ttl)
    }

    /// Build from configuration and an already-resolved key.
    pub fn from_config(key: &SigningKey, config: &AuthConfig) -> Self {
        Self::new(key, config.access_ttl, config.refresh_ttl)
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue an access token for `subject` with `role`.
    pub fn issue_access(
        &self,
        subject: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.sign(&Claims {
            sub: subject.to_string(),
            role: Some(role),
            typ: TokenType::Access,
            iat: now.timestamp(),
            exp: expires_after(now, self.access_ttl).timestamp(),
        })
    }

    /// Issue a refresh token for `subject`.
    pub fn issue_refresh(&self, subject: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.sign(&Claims {
            sub: subject.to_string(),
            role: None,
            typ: TokenType::Refresh,
            iat: now.timestamp(),
            exp: expires_after(now, self.refresh_ttl).timestamp(),
        })
    }

    /// Issue both tokens.
    pub fn issue_pair(
        &self,
        subject: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access(subject, role, now)?,
            refresh_token: self.issue_refresh(subject, now)?,
            token_type: "bearer".to_string(),
            expires_in: self.access_ttl.as_secs(),
        })
    }

    /// Verify signature, structure and expiry of any token we issued.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &validation())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::InvalidSignature => TokenError::BadSignature,
                JwtErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        if claims.is_expired(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    /// Verify a token and require it to be an access token.
    pub fn verify_access(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        self.verify_typed(token, TokenType::Access, now)
    }

    /// Verify a token and require it to be a refresh token.
    pub fn verify_refresh(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        self.verify_typed(token, TokenType::Refresh, now)
    }

    fn verify_typed(
        &self,
        token: &str,
        expected: TokenType,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let claims = self.verify(token, now)?;
        if claims.typ != expected {
            return Err(TokenError::WrongType {
                expected,
                found: claims.typ,
            });
        }
        Ok(claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }
}

/// HS256 only; expiry is checked by us against the caller's clock.
fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use chrono::TimeDelta;

    const TTL: i64 = 30 * 60;

    fn service() -> TokenService {
        TokenService::with_defaults(SigningKey::from_secret(
            "unit-key-4f9c2a7e81b3d6058e1a9c7f2b4d6e8a",
        ))
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp")
    }

    #[test]
    fn test_access_claims() {
        let svc = service();
        let token = svc.issue_access("alice", Role::Radiologist, t0()).expect("issue");
        let claims = svc.verify(&token, t0()).expect("verify");

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.role, Some(Role::Radiologist));
        assert_eq!(claims.typ, TokenType::Access);
        assert_eq!(claims.iat, t0().timestamp());
        assert_eq!(claims.exp, t0().timestamp() + TTL);
    }

    #[test]
    fn test_refresh_claims() {
        let svc = service();
        let token = svc.issue_refresh("alice", t0()).expect("issue");
        let claims = svc.verify(&token, t0()).expect("verify");

        assert_eq!(claims.typ, TokenType::Refresh);
        assert_eq!(claims.role, None);
        assert_eq!(claims.exp, t0().timestamp() + 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_expiry_boundary() {
        let svc = service();
        let token = svc.issue_access("alice", Role::Admin, t0()).expect("issue");

        assert!(svc.verify(&token, t0() + TimeDelta::seconds(TTL - 1)).is_ok());
        assert_eq!(
            svc.verify(&token, t0() + TimeDelta::seconds(TTL)),
            Err(TokenError::Expired)
        );
        assert_eq!(
            svc.verify(&token, t0() + TimeDelta::seconds(TTL + 1)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_refresh_never_passes_as_access() {
        let svc = service();
        let refresh = svc.issue_refresh("alice", t0()).expect("issue");
        let access = svc.issue_access("alice", Role::Admin, t0()).expect("issue");

        assert_eq!(
            svc.verify_access(&refresh, t0()),
            Err(TokenError::WrongType {
                expected: TokenType::Access,
                found: TokenType::Refresh,
            })
        );
        assert_eq!(
            svc.verify_refresh(&access, t0()),
            Err(TokenError::WrongType {
                expected: TokenType::Refresh,
                found: TokenType::Access,
            })
        );
        assert!(svc.verify_access(&access, t0()).is_ok());
        assert!(svc.verify_refresh(&refresh, t0()).is_ok());
    }

    #[test]
    fn test_wrong_key_is_bad_signature() {
        let other = TokenService::with_defaults(SigningKey::from_secret(
            "another-key-9d8c7b6a5f4e3d2c1b0a9f8e7d6c5b4a",
        ));
        let token = service().issue_access("alice", Role::Admin, t0()).expect("issue");

        assert_eq!(other.verify(&token, t0()), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_tampered_payload_is_bad_signature() {
        let svc = service();
        let token = svc.issue_access("alice", Role::Reviewer, t0()).expect("issue");
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        // Extend the expiry without re-signing
        let forged = Claims {
            sub: "alice".into(),
            role: Some(Role::Admin),
            typ: TokenType::Access,
            iat: t0().timestamp(),
            exp: t0().timestamp() + 365 * 24 * 60 * 60,
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).expect("json"));
        let tampered = format!("{}.{}.{}", parts[0], payload, parts[2]);

        assert_eq!(svc.verify(&tampered, t0()), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_malformed_tokens() {
        let svc = service();
        assert_eq!(svc.verify("", t0()), Err(TokenError::Malformed));
        assert_eq!(svc.verify("invalid.token.here", t0()), Err(TokenError::Malformed));
        assert_eq!(svc.verify("no-dots-at-all", t0()), Err(TokenError::Malformed));
    }

    #[test]
    fn test_pair() {
        let svc = service();
        let pair = svc.issue_pair("alice", Role::Reviewer, t0()).expect("issue");

        assert_ne!(pair.access_token, pair.refresh_token);
        assert_eq!(pair.token_type, "bearer");
        assert_eq!(pair.expires_in, 1800);
        assert!(svc.verify_access(&pair.access_token, t0()).is_ok());
        assert!(svc.verify_refresh(&pair.refresh_token, t0()).is_ok());
    }

    #[test]
    fn test_custom_ttls() {
        let key = SigningKey::from_secret("custom-ttl-key-1f2e3d4c5b6a79880a1b2c3d4e5f");
        let svc = TokenService::new(&key, Duration::from_secs(60), Duration::from_secs(120));
        let token = svc.issue_refresh("bob", t0()).expect("issue");

        assert!(svc.verify(&token, t0() + TimeDelta::seconds(119)).is_ok());
        assert_eq!(
            svc.verify(&token, t0() + TimeDelta::seconds(121)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", service());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("unit-key"));
    }
}
