//! Expiry Policy
//!
//! Pure functions deciding liveness and computing expiry timestamps.

use std::time::Duration;

/// Sentinel stored in `expired_at` for entries that never expire.
pub const NEVER_EXPIRES: i64 = -1;

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// == Is Live ==
/// A row is live at `now` iff it never expires or expires strictly after `now`.
pub fn is_live(expired_at: i64, now: i64) -> bool {
    expired_at == NEVER_EXPIRES || expired_at > now
}

// == Compute Expiry ==
/// Returns the `expired_at` value for a write at `now`.
///
/// An absent or zero TTL yields [`NEVER_EXPIRES`]. Sub-millisecond TTLs
/// round up to one millisecond so a positive TTL always expires.
pub fn compute_expiry(ttl: Option<Duration>, now: i64) -> i64 {
    match ttl.map(ttl_millis) {
        None | Some(0) => NEVER_EXPIRES,
        Some(ms) => now.saturating_add(ms),
    }
}

/// Explicit per-call TTL wins over the store default.
pub fn resolve_ttl(explicit: Option<Duration>, default: Option<Duration>) -> Option<Duration> {
    explicit.or(default)
}

fn ttl_millis(ttl: Duration) -> i64 {
    let ms = ttl.as_nanos().div_ceil(1_000_000);
    i64::try_from(ms).unwrap_or(i64::MAX)
}
