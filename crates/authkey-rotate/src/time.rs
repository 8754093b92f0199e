//! Time utilities for authkey-rotate.
//!
//! Chain timestamps (transaction expiration) are Unix epoch seconds (u64).

use std::time::Duration;

/// Return the current time as seconds since Unix epoch.
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Expiration timestamp for a transaction submitted now with the given TTL.
pub fn expiration_from_now(ttl: Duration) -> u64 {
    now_secs().saturating_add(ttl.as_secs())
}

/// Convert epoch seconds to an RFC 3339 string.
pub fn secs_to_rfc3339(secs: u64) -> String {
    let dt = chrono::DateTime::from_timestamp(secs as i64, 0).unwrap_or(chrono::DateTime::UNIX_EPOCH);
    dt.to_rfc3339()
}
