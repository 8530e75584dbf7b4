//! Retention sweep for month buckets.
//!
//! # Responsibility
//! - Decide which month keys survive once the store exceeds its quota.
//!
//! # Invariants
//! - The sweep is a no-op while the key count is within `max_months`.
//! - After a sweep, at most `max_months` keys remain.
//! - Only whole months are evicted; retained values are untouched.

use crate::model::month_key::MonthKey;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Tie-break used when more months are stored than the quota allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Evict the chronologically smallest keys until the quota holds.
    ///
    /// Months before the current month always sort first, so they go first;
    /// older months survive when fewer than `max_months` current/future
    /// months exist.
    #[default]
    OldestFirst,
    /// Drop every month before the current month, then keep the earliest
    /// `max_months` of the rest.
    ///
    /// Upcoming months nearest to now win, so once past months are gone the
    /// latest keys are trimmed, not the smallest remaining ones. Months far
    /// ahead are dropped before the current month ever is.
    DropPast,
}

impl EvictionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OldestFirst => "oldest_first",
            Self::DropPast => "drop_past",
        }
    }
}

impl Display for EvictionPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown eviction policy names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEvictionPolicy(pub String);

impl Display for UnknownEvictionPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown eviction policy `{}`; expected oldest_first|drop_past",
            self.0
        )
    }
}

impl Error for UnknownEvictionPolicy {}

impl FromStr for EvictionPolicy {
    type Err = UnknownEvictionPolicy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "oldest_first" => Ok(Self::OldestFirst),
            "drop_past" => Ok(Self::DropPast),
            other => Err(UnknownEvictionPolicy(other.to_string())),
        }
    }
}

/// Result of one retention sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swept<V> {
    pub retained: BTreeMap<MonthKey, V>,
    /// Evicted keys, ascending.
    pub evicted: Vec<MonthKey>,
}

/// Applies the retention policy to `buckets` as of month `now`.
pub fn sweep<V>(
    mut buckets: BTreeMap<MonthKey, V>,
    now: MonthKey,
    max_months: usize,
    policy: EvictionPolicy,
) -> Swept<V> {
    let mut evicted = Vec::new();
    if buckets.len() <= max_months {
        return Swept {
            retained: buckets,
            evicted,
        };
    }

    match policy {
        EvictionPolicy::OldestFirst => {
            while buckets.len() > max_months {
                match buckets.pop_first() {
                    Some((key, _)) => evicted.push(key),
                    None => break,
                }
            }
        }
        EvictionPolicy::DropPast => {
            let mut upcoming = buckets.split_off(&now);
            evicted.extend(buckets.into_keys());
            let mut overflow = Vec::new();
            while upcoming.len() > max_months {
                match upcoming.pop_last() {
                    Some((key, _)) => overflow.push(key),
                    None => break,
                }
            }
            overflow.reverse();
            evicted.extend(overflow);
            buckets = upcoming;
        }
    }

    Swept {
        retained: buckets,
        evicted,
    }
}

#[cfg(test)]
mod tests {
    use super::{sweep, EvictionPolicy};
    use crate::model::month_key::MonthKey;
    use std::collections::BTreeMap;

    fn key(text: &str) -> MonthKey {
        text.parse().unwrap()
    }

    fn buckets(keys: &[&str]) -> BTreeMap<MonthKey, ()> {
        keys.iter().map(|text| (key(text), ())).collect()
    }

    fn keys_of(map: &BTreeMap<MonthKey, ()>) -> Vec<String> {
        map.keys().map(ToString::to_string).collect()
    }

    #[test]
    fn within_quota_is_untouched_even_with_past_months() {
        let input = buckets(&["2024-11", "2024-12", "2025-01"]);
        for policy in [EvictionPolicy::OldestFirst, EvictionPolicy::DropPast] {
            let swept = sweep(input.clone(), key("2025-04"), 3, policy);
            assert_eq!(swept.retained, input);
            assert!(swept.evicted.is_empty());
        }
    }

    #[test]
    fn oldest_first_keeps_latest_months() {
        let input = buckets(&["2025-01", "2025-02", "2025-03", "2025-04"]);
        let swept = sweep(input, key("2025-04"), 3, EvictionPolicy::OldestFirst);
        assert_eq!(keys_of(&swept.retained), ["2025-02", "2025-03", "2025-04"]);
        assert_eq!(swept.evicted, vec![key("2025-01")]);
    }

    #[test]
    fn oldest_first_evicts_past_before_future() {
        let input = buckets(&["2025-03", "2025-04", "2025-05", "2025-06", "2025-07"]);
        let swept = sweep(input, key("2025-05"), 3, EvictionPolicy::OldestFirst);
        assert_eq!(keys_of(&swept.retained), ["2025-05", "2025-06", "2025-07"]);
        assert_eq!(swept.evicted, vec![key("2025-03"), key("2025-04")]);
    }

    #[test]
    fn oldest_first_trims_future_surplus_from_the_front() {
        let input = buckets(&["2025-05", "2025-06", "2025-07", "2025-08"]);
        let swept = sweep(input, key("2025-05"), 3, EvictionPolicy::OldestFirst);
        assert_eq!(keys_of(&swept.retained), ["2025-06", "2025-07", "2025-08"]);
    }

    #[test]
    fn drop_past_discards_every_past_month() {
        let input = buckets(&["2025-01", "2025-02", "2025-03", "2025-04"]);
        let swept = sweep(input, key("2025-04"), 3, EvictionPolicy::DropPast);
        assert_eq!(keys_of(&swept.retained), ["2025-04"]);
        assert_eq!(
            swept.evicted,
            vec![key("2025-01"), key("2025-02"), key("2025-03")]
        );
    }

    #[test]
    fn drop_past_keeps_earliest_upcoming_months() {
        let input = buckets(&["2025-04", "2025-05", "2025-06", "2025-07", "2025-08"]);
        let swept = sweep(input, key("2025-05"), 3, EvictionPolicy::DropPast);
        assert_eq!(keys_of(&swept.retained), ["2025-05", "2025-06", "2025-07"]);
        assert_eq!(swept.evicted, vec![key("2025-04"), key("2025-08")]);
    }

    #[test]
    fn policy_names_round_trip() {
        for policy in [EvictionPolicy::OldestFirst, EvictionPolicy::DropPast] {
            assert_eq!(policy.as_str().parse::<EvictionPolicy>().unwrap(), policy);
        }
        assert_eq!(
            "Drop-Past".parse::<EvictionPolicy>().unwrap(),
            EvictionPolicy::DropPast
        );
        assert!("newest".parse::<EvictionPolicy>().is_err());
    }
}
