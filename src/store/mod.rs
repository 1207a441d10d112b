//! Composite-key record store.
//!
//! Records are serde_json strings behind stable string keys, one record per
//! key. Implementations must allow concurrent access from independent keys
//! without external locking; the bulk paths only ever enumerate distinct
//! keys.

mod file;

pub use file::FileStore;

use crate::error::StoreError;
use crate::models::DataKind;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// Record kinds stored per race key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RaceRecordKind {
    Stats,
    Odds,
}

/// Composite key for a stored record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Race-level record for (date, place, race).
    Race {
        date: String,
        place_number: u8,
        race_number: u8,
        kind: RaceRecordKind,
    },
    /// Day-level open-API record.
    Day { date: String, kind: DataKind },
}

impl StoreKey {
    pub fn stats(date: &str, place_number: u8, race_number: u8) -> Self {
        StoreKey::Race {
            date: date.to_string(),
            place_number,
            race_number,
            kind: RaceRecordKind::Stats,
        }
    }

    pub fn odds(date: &str, place_number: u8, race_number: u8) -> Self {
        StoreKey::Race {
            date: date.to_string(),
            place_number,
            race_number,
            kind: RaceRecordKind::Odds,
        }
    }

    pub fn day(date: &str, kind: DataKind) -> Self {
        StoreKey::Day {
            date: date.to_string(),
            kind,
        }
    }

    /// Stable string form: `{date}_{place:02}_{race:02}` for stats records,
    /// with an `_odds` suffix for odds records, `{date}_{kind}` for day
    /// records.
    pub fn as_string(&self) -> String {
        match self {
            StoreKey::Race {
                date,
                place_number,
                race_number,
                kind,
            } => {
                let base = format!("{}_{:02}_{:02}", date, place_number, race_number);
                match kind {
                    RaceRecordKind::Stats => base,
                    RaceRecordKind::Odds => format!("{}_odds", base),
                }
            }
            StoreKey::Day { date, kind } => format!("{}_{}", date, kind.as_str()),
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// Key-value store over serialized records.
pub trait RaceStore: Send + Sync {
    fn get(&self, key: &StoreKey) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &StoreKey, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &StoreKey) -> Result<(), StoreError>;
    fn list_keys(&self) -> Result<Vec<String>, StoreError>;
    fn clear_all(&self) -> Result<(), StoreError>;
}

/// Typed read through the store.
pub fn get_record<T: DeserializeOwned>(
    store: &dyn RaceStore,
    key: &StoreKey,
) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Typed write through the store.
pub fn put_record<T: Serialize>(
    store: &dyn RaceStore,
    key: &StoreKey,
    record: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(record)?;
    store.put(key, &json)
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RaceStore for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<Option<String>, StoreError> {
        let records = self.records.lock().unwrap();
        Ok(records.get(&key.as_string()).cloned())
    }

    fn put(&self, key: &StoreKey, value: &str) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        records.insert(key.as_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &StoreKey) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        records.remove(&key.as_string());
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let records = self.records.lock().unwrap();
        let mut keys: Vec<String> = records.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        records.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::race::RaceData;

    #[test]
    fn test_key_formatting() {
        assert_eq!(
            StoreKey::stats("2024-12-01", 1, 1).as_string(),
            "2024-12-01_01_01"
        );
        assert_eq!(
            StoreKey::odds("2024-12-01", 23, 12).as_string(),
            "2024-12-01_23_12_odds"
        );
        assert_eq!(
            StoreKey::day("20241201", DataKind::Results).as_string(),
            "20241201_results"
        );
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        let key = StoreKey::stats("2024-12-01", 5, 8);

        assert!(store.get(&key).unwrap().is_none());
        store.put(&key, "{\"x\":1}").unwrap();
        assert_eq!(store.get(&key).unwrap().as_deref(), Some("{\"x\":1}"));

        store.delete(&key).unwrap();
        assert!(store.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_memory_store_list_and_clear() {
        let store = MemoryStore::new();
        store.put(&StoreKey::stats("2024-12-01", 1, 2), "{}").unwrap();
        store.put(&StoreKey::odds("2024-12-01", 1, 2), "{}").unwrap();

        let keys = store.list_keys().unwrap();
        assert_eq!(keys, vec!["2024-12-01_01_02", "2024-12-01_01_02_odds"]);

        store.clear_all().unwrap();
        assert!(store.list_keys().unwrap().is_empty());
    }

    #[test]
    fn test_typed_record_round_trip() {
        let store = MemoryStore::new();
        let key = StoreKey::stats("2024-12-01", 1, 1);

        let mut data = RaceData::new();
        data.escape_last_year = 0.31;
        put_record(&store, &key, &data).unwrap();

        let back: RaceData = get_record(&store, &key).unwrap().unwrap();
        assert_eq!(back.escape_last_year, 0.31);
    }
}
