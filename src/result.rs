//! Histogram and per-item result types.
//!
//! Bitstring ordering: the rightmost bit corresponds to the
//! lowest-indexed qubit. For example, the string `"01"` means qubit 0
//! measured `1` and qubit 1 measured `0`.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Measurement counts from executing one work item.
///
/// Maps outcome labels (bitstrings) to occurrence counts. Serializes as a
/// flat JSON object, e.g. `{"00": 498, "11": 502}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counts {
    counts: FxHashMap<String, u64>,
}

impl Counts {
    /// Create empty counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create counts from an iterator of (bitstring, count) pairs.
    /// Duplicate bitstrings are summed, consistent with `insert()`.
    pub fn from_pairs(iter: impl IntoIterator<Item = (impl Into<String>, u64)>) -> Self {
        let mut counts = Self::new();
        for (k, v) in iter {
            counts.insert(k, v);
        }
        counts
    }

    /// Insert a count for a bitstring.
    pub fn insert(&mut self, bitstring: impl Into<String>, count: u64) {
        let key = bitstring.into();
        *self.counts.entry(key).or_default() += count;
    }

    /// Get the count for a bitstring.
    pub fn get(&self, bitstring: &str) -> u64 {
        self.counts.get(bitstring).copied().unwrap_or(0)
    }

    /// Get the total number of shots.
    pub fn total_shots(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Get the number of unique bitstrings.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Check if counts are empty.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Outcome for one submitted work item.
///
/// Exactly one record exists per input item, in input order. An item whose
/// data the service could not produce is [`ResultRecord::Unavailable`] and
/// serializes as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultRecord {
    /// Fetched histogram.
    Histogram(Counts),
    /// The service reported no data for this item.
    Unavailable,
}

impl ResultRecord {
    /// The histogram, if available.
    pub fn counts(&self) -> Option<&Counts> {
        match self {
            ResultRecord::Histogram(counts) => Some(counts),
            ResultRecord::Unavailable => None,
        }
    }

    /// Whether this record is the unavailable marker.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ResultRecord::Unavailable)
    }
}

impl From<Counts> for ResultRecord {
    fn from(counts: Counts) -> Self {
        ResultRecord::Histogram(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_basic() {
        let mut counts = Counts::new();
        counts.insert("00", 500);
        counts.insert("11", 500);
        counts.insert("11", 1);

        assert_eq!(counts.get("00"), 500);
        assert_eq!(counts.get("11"), 501);
        assert_eq!(counts.get("01"), 0);
        assert_eq!(counts.total_shots(), 1001);
    }

    #[test]
    fn test_record_json_shape() {
        let records = vec![
            ResultRecord::from(Counts::from_pairs([("11", 1000)])),
            ResultRecord::Unavailable,
        ];
        let json = serde_json::to_string(&records).unwrap();
        assert_eq!(json, r#"[{"11":1000},null]"#);

        let back: Vec<ResultRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, records);
    }
}
