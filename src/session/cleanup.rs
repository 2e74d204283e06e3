//! Idle-session expiry
//!
//! Sessions that have not been touched for longer than the TTL are dropped
//! from memory by a periodic background task.

use chrono::{DateTime, Duration, Utc};

/// Default TTL for idle sessions (30 days)
pub const SESSION_TTL_DAYS: i64 = 30;

/// Cleanup interval (1 hour)
pub const CLEANUP_INTERVAL_SECS: u64 = 60 * 60;

/// Checks if a session is expired based on its last access time
pub fn is_expired(last_accessed: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(last_accessed) > ttl
}
