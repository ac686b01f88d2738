//! Persisted post ordering.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::date::parse_timestamp;

/// A single post's rank in the canonical order (0 = newest).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderEntry {
    pub post_id: String,
    pub order: usize,
}

impl OrderEntry {
    pub fn new(post_id: impl Into<String>, order: usize) -> Self {
        Self {
            post_id: post_id.into(),
            order,
        }
    }
}

/// The durable ranking of posts across runs (`post_order.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderTable {
    /// When the table was last reconciled
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,

    /// Entries sorted by `order`
    #[serde(default, rename = "posts")]
    pub entries: Vec<OrderEntry>,
}

impl OrderTable {
    pub fn new(entries: Vec<OrderEntry>, updated_at: DateTime<Utc>) -> Self {
        Self {
            updated_at,
            entries,
        }
    }

    /// Rank lookup by post id. The first entry wins if an id repeats.
    pub fn ranks(&self) -> HashMap<&str, usize> {
        let mut ranks = HashMap::with_capacity(self.entries.len());
        for entry in &self.entries {
            ranks.entry(entry.post_id.as_str()).or_insert(entry.order);
        }
        ranks
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether ranks form a dense `0..N` permutation over unique ids.
    pub fn is_dense(&self) -> bool {
        let mut seen = vec![false; self.entries.len()];
        let mut ids = std::collections::HashSet::new();
        self.entries.iter().all(|entry| {
            ids.insert(entry.post_id.as_str())
                && entry.order < seen.len()
                && !std::mem::replace(&mut seen[entry.order], true)
        })
    }
}

/// Tables written by older tools carry offset-less timestamps; an unreadable
/// timestamp must not invalidate the ranking itself.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    Ok(parse_timestamp(&raw).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_layout() {
        let table = OrderTable::new(
            vec![OrderEntry::new("a", 0), OrderEntry::new("b", 1)],
            DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["posts"][1]["post_id"], "b");
        assert_eq!(json["posts"][1]["order"], 1);
        assert!(json["updated_at"].is_string());
    }

    #[test]
    fn test_reads_naive_timestamp() {
        let table: OrderTable = serde_json::from_str(
            r#"{"updated_at": "2024-03-01T08:00:00.250000", "posts": [{"post_id": "x", "order": 0}]}"#,
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.ranks().get("x"), Some(&0));
    }

    #[test]
    fn test_is_dense() {
        let now = Utc::now();
        let dense = OrderTable::new(vec![OrderEntry::new("a", 1), OrderEntry::new("b", 0)], now);
        assert!(dense.is_dense());

        let gap = OrderTable::new(vec![OrderEntry::new("a", 0), OrderEntry::new("b", 2)], now);
        assert!(!gap.is_dense());

        let dup = OrderTable::new(vec![OrderEntry::new("a", 0), OrderEntry::new("a", 1)], now);
        assert!(!dup.is_dense());
    }
}
