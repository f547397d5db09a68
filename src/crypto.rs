//! Cryptographic helpers shared by the token and reset modules
//!
//! ## Security Patterns
//!
//! - **Constant-Time Comparison**: secret comparisons never exit early
//! - **OS Randomness**: opaque tokens come straight from the OS RNG

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

/// Compare two strings in constant time with respect to their content.
///
/// Length differences still return early; only equal-length inputs are
/// compared byte by byte without short-circuiting.
///
/// ```
/// use review_auth::crypto::constant_time_str_eq;
///
/// assert!(constant_time_str_eq("abc123", "abc123"));
/// assert!(!constant_time_str_eq("abc123", "abc124"));
/// ```
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Generate `n_bytes` of OS randomness encoded as URL-safe base64 without padding.
///
/// 32 bytes yields a 43-character token carrying 256 bits of entropy.
pub fn random_token(n_bytes: usize) -> String {
    let mut bytes = vec![0u8; n_bytes];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
