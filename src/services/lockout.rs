//! Account lockout policy.
//!
//! Pure decision logic only; the atomic counter update lives in the account
//! repository so concurrent failed attempts against one account cannot
//! under-count.

use chrono::{DateTime, Duration, Utc};

use crate::config::LockoutConfig;

#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    /// Failed attempts at which the account locks.
    pub max_attempts: i32,

    pub lock_duration: Duration,
}

impl LockoutPolicy {
    #[must_use]
    pub fn from_config(config: &LockoutConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            lock_duration: Duration::minutes(config.lock_duration_minutes),
        }
    }

    /// Given the failure count after an increment, decide whether the account
    /// locks and until when. The count itself stays at the threshold; it is
    /// only reset by a successful login.
    #[must_use]
    pub fn lock_after(&self, failed_count: i32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        (failed_count >= self.max_attempts).then(|| now + self.lock_duration)
    }
}

/// An account is locked when `locked_until` parses and is strictly in the
/// future. A stale value that was never cleared no longer blocks login.
#[must_use]
pub fn is_locked(locked_until: Option<&str>, now: DateTime<Utc>) -> bool {
    locked_until
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .is_some_and(|until| until > now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LockoutPolicy {
        LockoutPolicy {
            max_attempts: 5,
            lock_duration: Duration::hours(2),
        }
    }

    #[test]
    fn test_no_lock_below_threshold() {
        let now = Utc::now();
        assert_eq!(policy().lock_after(1, now), None);
        assert_eq!(policy().lock_after(4, now), None);
    }

    #[test]
    fn test_lock_at_threshold() {
        let now = Utc::now();
        assert_eq!(policy().lock_after(5, now), Some(now + Duration::hours(2)));
        // Counts past the threshold keep the account locked too.
        assert!(policy().lock_after(6, now).is_some());
    }

    #[test]
    fn test_is_locked_future() {
        let now = Utc::now();
        let until = (now + Duration::minutes(10)).to_rfc3339();
        assert!(is_locked(Some(&until), now));
    }

    #[test]
    fn test_is_locked_past_or_absent() {
        let now = Utc::now();
        let until = (now - Duration::minutes(10)).to_rfc3339();
        assert!(!is_locked(Some(&until), now));
        assert!(!is_locked(None, now));
    }

    #[test]
    fn test_is_locked_exact_boundary() {
        // Strictly greater-than: a lock expiring exactly now does not block.
        let now = Utc::now();
        assert!(!is_locked(Some(&now.to_rfc3339()), now));
    }

    #[test]
    fn test_is_locked_unparseable_value() {
        assert!(!is_locked(Some("not-a-timestamp"), Utc::now()));
    }
}
