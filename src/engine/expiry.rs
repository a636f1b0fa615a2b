//! Content expiry rules
//!
//! Two rules cover everything: a fixed `expires_at` stamped on the row, and
//! a derived TTL for pick posts, which expire relative to the linked game's
//! start time rather than their own creation. The expire-content job's SQL
//! mirrors these helpers; they exist so the cutoff math has one definition
//! and unit tests.

use chrono::{DateTime, Duration, Utc};

/// Fixed-TTL rule: expired once `expires_at` has passed
pub fn fixed_expiry_due(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(expires_at, Some(at) if at <= now)
}

/// Derived-TTL rule: a pick post lives `ttl_hours` past its game's start
pub fn pick_expires_at(game_start: DateTime<Utc>, ttl_hours: i64) -> DateTime<Utc> {
    game_start + Duration::hours(ttl_hours)
}

/// Messages older than this cutoff are expired
pub fn message_cutoff(now: DateTime<Utc>, ttl_hours: i64) -> DateTime<Utc> {
    now - Duration::hours(ttl_hours)
}

/// Soft-deleted rows older than this cutoff are hard-deleted
pub fn retention_cutoff(now: DateTime<Utc>, retention_days: i64) -> DateTime<Utc> {
    now - Duration::days(retention_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fixed_expiry() {
        assert!(fixed_expiry_due(Some(now() - Duration::minutes(1)), now()));
        assert!(fixed_expiry_due(Some(now()), now()));
        assert!(!fixed_expiry_due(Some(now() + Duration::minutes(1)), now()));
        assert!(!fixed_expiry_due(None, now()));
    }

    #[test]
    fn test_pick_expiry_tracks_game_start_not_creation() {
        // Game starts tomorrow; a pick posted today must outlive its own
        // creation-based TTL and expire 24h after tipoff instead.
        let game_start = now() + Duration::hours(20);
        let expiry = pick_expires_at(game_start, 24);
        assert_eq!(expiry, game_start + Duration::hours(24));
        assert!(expiry > now() + Duration::hours(24));
    }

    #[test]
    fn test_cutoffs() {
        assert_eq!(message_cutoff(now(), 48), now() - Duration::hours(48));
        assert_eq!(retention_cutoff(now(), 30), now() - Duration::days(30));
    }
}
