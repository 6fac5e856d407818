//! Pre-run setup: repopulate the table with zeroed records.

use tracing::info;
use uuid::Uuid;

use crate::store::{CounterStore, Record, StoreError};

/// `count` zeroed records, each under a fresh UUID v4.
pub fn generate_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|_| Record::zeroed(Uuid::new_v4().to_string()))
        .collect()
}

/// Truncates the store and inserts `count` zeroed records.
///
/// Returns the records that were inserted.
pub fn seed_records(store: &dyn CounterStore, count: usize) -> Result<Vec<Record>, StoreError> {
    info!(records = count, "initializing table");
    let records = generate_records(count);
    store.reset(&records)?;
    info!(records = count, "table initialized");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use std::collections::HashSet;

    #[test]
    fn test_generate_records() {
        let records = generate_records(100);
        assert_eq!(records.len(), 100);
        let ids: HashSet<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 100);
        assert!(records.iter().all(|r| r.counter == 0 && r.id.len() == 36));
    }

    #[test]
    fn test_seed_replaces_existing_rows() {
        let store = MemoryStore::from_records([Record {
            id: "old".into(),
            counter: 9,
        }]);
        let seeded = seed_records(&store, 3).unwrap();
        let ids = store.load_ids().unwrap();
        assert_eq!(ids.len(), 3);
        assert!(!ids.contains(&"old".to_string()));
        for record in seeded {
            assert_eq!(store.counter(&record.id), Some(0));
        }
    }

    #[test]
    fn test_seed_zero_records() {
        let store = MemoryStore::with_records(5);
        seed_records(&store, 0).unwrap();
        assert!(store.load_ids().unwrap().is_empty());
    }
}
