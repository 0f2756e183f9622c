//! Canonical ordering of entity collections.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::utils::cmp_ignore_case;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Value a record is ordered by.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey<'a> {
    /// Case-insensitive alphabetical
    Text(&'a str),
    Time(DateTime<Utc>),
    /// Explicit `Order` field
    Order(i64),
}

impl SortKey<'_> {
    fn compare(&self, other: &SortKey<'_>) -> Ordering {
        match (self, other) {
            (SortKey::Text(a), SortKey::Text(b)) => cmp_ignore_case(a, b),
            (SortKey::Time(a), SortKey::Time(b)) => a.cmp(b),
            (SortKey::Order(a), SortKey::Order(b)) => a.cmp(b),
            // One extractor never mixes kinds; keep the order total anyway
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Text(_) => 0,
            SortKey::Time(_) => 1,
            SortKey::Order(_) => 2,
        }
    }
}

/// Compare two keys in the given direction.
pub fn compare_keys(a: &SortKey<'_>, b: &SortKey<'_>, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => a.compare(b),
        SortDirection::Descending => b.compare(a),
    }
}

/// Stable sort: records with equal keys keep their incoming order.
pub fn sort_records<T>(
    records: &mut [T],
    key: impl for<'r> Fn(&'r T) -> SortKey<'r>,
    direction: SortDirection,
) {
    records.sort_by(|a, b| compare_keys(&key(a), &key(b), direction));
}
