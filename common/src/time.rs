//! Time utilities for rate freshness.

use chrono::{DateTime, Duration, Utc};

/// A timestamp (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Time elapsed since `timestamp`; zero for timestamps in the future.
pub fn age_of(timestamp: Timestamp) -> Duration {
    let age = now() - timestamp;
    if age < Duration::zero() {
        Duration::zero()
    } else {
        age
    }
}

/// Check whether `timestamp` is younger than `window`.
pub fn is_within(timestamp: Timestamp, window: Duration) -> bool {
    age_of(timestamp) < window
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_within() {
        let recent = now() - Duration::seconds(10);
        assert!(is_within(recent, Duration::minutes(1)));

        let old = now() - Duration::minutes(10);
        assert!(!is_within(old, Duration::minutes(1)));
    }

    #[test]
    fn test_future_timestamp_has_zero_age() {
        let future = now() + Duration::seconds(10);
        assert_eq!(age_of(future), Duration::zero());
    }
}
