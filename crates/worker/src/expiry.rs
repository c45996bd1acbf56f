//! Freshness policies for stored entries.
//!
//! The strategy asks the policy whether a hit may be served. A stale hit is
//! treated as a miss and refreshed from the network; if the network then
//! fails, the stale entry is still served.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use ephone_core::CachedEntry;

pub trait ExpiryPolicy: Send + Sync + fmt::Debug {
    fn is_fresh(&self, entry: &CachedEntry, now: DateTime<Utc>) -> bool;
}

/// Entries never expire. Versioned store names are the only invalidation.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaleForever;

impl ExpiryPolicy for StaleForever {
    fn is_fresh(&self, _entry: &CachedEntry, _now: DateTime<Utc>) -> bool {
        true
    }
}

/// Entries older than the given age are refreshed.
#[derive(Debug, Clone, Copy)]
pub struct MaxAge(pub Duration);

impl ExpiryPolicy for MaxAge {
    fn is_fresh(&self, entry: &CachedEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.stored_at) <= self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ephone_core::Response;

    fn entry_at(stored_at: DateTime<Utc>) -> CachedEntry {
        CachedEntry { response: Response::ok("x"), stored_at }
    }

    #[test]
    fn test_stale_forever() {
        let old = entry_at(Utc::now() - Duration::days(3650));
        assert!(StaleForever.is_fresh(&old, Utc::now()));
    }

    #[test]
    fn test_max_age() {
        let now = Utc::now();
        let policy = MaxAge(Duration::hours(1));
        assert!(policy.is_fresh(&entry_at(now - Duration::minutes(59)), now));
        assert!(!policy.is_fresh(&entry_at(now - Duration::minutes(61)), now));
    }
}
