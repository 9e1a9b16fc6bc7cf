//! Staleness check for sources that only expose "the current result".
//!
//! When the remote offers no per-job status, the only way to tell a new
//! result from the leftover of an earlier run is to compare timestamps.
//! The local `started_at` is authoritative; the remote clock is not
//! trusted for anything beyond the comparison below.

use crate::types::Timestamp;

/// Outcome of checking a candidate result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Produced after the job started.
    Fresh,
    /// Produced at or before the job started; belongs to an earlier run.
    Stale,
    /// The result carries no production time, so it cannot be checked.
    /// Only sources polled by explicit job id accept these; see
    /// [`check_dated`] for the rest.
    Unchecked,
}

impl Freshness {
    /// Whether the result may be surfaced.
    pub fn is_usable(&self) -> bool {
        !matches!(self, Freshness::Stale)
    }
}

/// `produced_at > started_at`.
pub fn is_fresh(produced_at: Timestamp, started_at: Timestamp) -> bool {
    produced_at > started_at
}

/// Classify a result given its optional production time.
pub fn check(produced_at: Option<Timestamp>, started_at: Timestamp) -> Freshness {
    match produced_at {
        None => Freshness::Unchecked,
        Some(at) if is_fresh(at, started_at) => Freshness::Fresh,
        Some(_) => Freshness::Stale,
    }
}

/// Like [`check`], for sources that only expose the current result. An
/// undated result there cannot be told apart from a leftover, so it is
/// classified as stale.
pub fn check_dated(produced_at: Option<Timestamp>, started_at: Timestamp) -> Freshness {
    match produced_at {
        None => Freshness::Stale,
        Some(_) => check(produced_at, started_at),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn later_result_is_fresh() {
        let start = Utc::now();
        assert!(is_fresh(start + Duration::seconds(22), start));
        assert_eq!(check(Some(start + Duration::milliseconds(1)), start), Freshness::Fresh);
    }

    #[test]
    fn equal_timestamp_is_stale() {
        let start = Utc::now();
        assert!(!is_fresh(start, start));
        assert_eq!(check(Some(start), start), Freshness::Stale);
    }

    #[test]
    fn earlier_result_is_stale() {
        let start = Utc::now();
        let freshness = check(Some(start - Duration::minutes(10)), start);
        assert_eq!(freshness, Freshness::Stale);
        assert!(!freshness.is_usable());
    }

    #[test]
    fn missing_timestamp_is_unchecked_but_usable() {
        let freshness = check(None, Utc::now());
        assert_eq!(freshness, Freshness::Unchecked);
        assert!(freshness.is_usable());
    }

    #[test]
    fn dated_check_rejects_missing_timestamp() {
        let start = Utc::now();
        assert_eq!(check_dated(None, start), Freshness::Stale);
        assert_eq!(check_dated(Some(start), start), Freshness::Stale);
        assert_eq!(
            check_dated(Some(start + Duration::seconds(3)), start),
            Freshness::Fresh
        );
    }
}
