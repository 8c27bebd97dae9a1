/// Data models for database entities
///
/// Table rows use sqlx for typed queries; the recency payload is the JSON
/// document stored under `mru.cache`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Scope under which the palette keeps its state entries
pub const PALETTE_SCOPE: &str = "palette";

/// Key of the serialized recency cache
pub const MRU_CACHE_KEY: &str = "mru.cache";

/// Key of the next usage counter
pub const MRU_COUNTER_KEY: &str = "mru.counter";

/// A scoped key-value row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StateEntry {
    pub scope: String,
    pub key: String,
    pub value: String,
    pub updated_at: String, // ISO 8601 format
}

/// User preference
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Preference {
    pub key: String,
    pub value: String,
}

/// Persisted form of the recency cache
///
/// Newer writers always set `usesLRU` and store entries oldest first. Older
/// writers omitted the flag and stored entries in arbitrary order, relying on
/// the counters alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerializedRecency {
    #[serde(rename = "usesLRU", default)]
    pub uses_lru: bool,
    #[serde(default)]
    pub entries: Vec<SerializedEntry>,
}

/// One `{ key, value }` pair of the recency cache
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerializedEntry {
    pub key: String,
    pub value: u64,
}

impl SerializedRecency {
    /// Entries ordered oldest to newest, whichever encoding was stored
    pub fn into_recency_order(self) -> Vec<SerializedEntry> {
        let mut entries = self.entries;
        if !self.uses_lru {
            entries.sort_by_key(|entry| entry.value);
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_payload_sorts_by_counter() {
        let legacy: SerializedRecency = serde_json::from_str(
            r#"{"entries":[{"key":"b","value":9},{"key":"a","value":2},{"key":"c","value":5}]}"#,
        )
        .unwrap();
        assert!(!legacy.uses_lru);

        let keys: Vec<String> = legacy
            .into_recency_order()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_lru_payload_keeps_stored_order() {
        let ordered: SerializedRecency = serde_json::from_str(
            r#"{"usesLRU":true,"entries":[{"key":"b","value":9},{"key":"a","value":2}]}"#,
        )
        .unwrap();

        let keys: Vec<String> = ordered
            .into_recency_order()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_serializes_with_wire_names() {
        let payload = SerializedRecency {
            uses_lru: true,
            entries: vec![SerializedEntry {
                key: "editor.format".to_string(),
                value: 3,
            }],
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(
            json,
            r#"{"usesLRU":true,"entries":[{"key":"editor.format","value":3}]}"#
        );
    }
}
