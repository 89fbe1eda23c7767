//! Signed-URL verification for the page proxy
//!
//! Requests carry `?sig={hex}&t={unixSeconds}` where `sig` is an HMAC-SHA256
//! over `"{path}:{timestamp}"` with the shared secret. Verification is
//! constant-time and every failure mode collapses to `false`; the HTTP layer
//! exposes all of them uniformly as 403.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Accepted clock skew in either direction, in seconds
pub const MAX_SIGNATURE_AGE_SECS: i64 = 3600;

/// Compute the hex signature for a path and timestamp. Used by tests and
/// by whatever issues signed links.
pub fn sign(path: &str, timestamp: i64, secret: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(format!("{}:{}", path, timestamp).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a signature against the current clock.
pub fn verify(
    path: &str,
    timestamp: Option<&str>,
    signature_hex: Option<&str>,
    secret: &str,
) -> bool {
    verify_at(path, timestamp, signature_hex, secret, Utc::now().timestamp())
}

/// Verify a signature at an explicit `now`, so the replay window is testable.
///
/// Rejects when the timestamp is missing, unparseable, or more than
/// [`MAX_SIGNATURE_AGE_SECS`] away from `now` in either direction, when the
/// signature is missing or not valid hex, or when the MAC does not match.
pub fn verify_at(
    path: &str,
    timestamp: Option<&str>,
    signature_hex: Option<&str>,
    secret: &str,
    now: i64,
) -> bool {
    let ts = match timestamp.and_then(|t| t.parse::<i64>().ok()) {
        Some(ts) => ts,
        None => return false,
    };
    if (now - ts).abs() > MAX_SIGNATURE_AGE_SECS {
        return false;
    }
    let sig = match signature_hex.and_then(|s| hex::decode(s).ok()) {
        Some(sig) => sig,
        None => return false,
    };
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(format!("{}:{}", path, ts).as_bytes());
    mac.verify_slice(&sig).is_ok()
}
