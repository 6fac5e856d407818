//! The immutable set of identifiers a run targets.
//!
//! The snapshot is read once, before any worker starts, and then only sampled.
//! Records inserted after the snapshot was taken are never targeted.
//!
//! # Examples
//!
//! ```rust
//! use contesa::snapshot::KeySnapshot;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let snapshot = KeySnapshot::from_ids(["a", "b", "c"]).unwrap();
//! let mut rng = StdRng::seed_from_u64(1);
//!
//! let id = snapshot.pick(&mut rng);
//! assert!(snapshot.ids().contains(id));
//! ```

use std::sync::Arc;

use rand::Rng;
use thiserror::Error;

use crate::store::{CounterStore, StoreError};

/// Errors raised while taking a [`KeySnapshot`].
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// There is nothing to update.
    #[error("no records to target; initialize the table first")]
    Empty,

    #[error("cannot load record identifiers: {0}")]
    Store(#[from] StoreError),
}

/// Identifiers fetched once before the run, never empty.
#[derive(Debug, Clone)]
pub struct KeySnapshot {
    ids: Arc<[Arc<str>]>,
}

impl KeySnapshot {
    /// Reads every identifier from `store`.
    pub fn load(store: &dyn CounterStore) -> Result<Self, SnapshotError> {
        Self::from_ids(store.load_ids()?)
    }

    /// Builds a snapshot from known identifiers.
    pub fn from_ids<I, S>(ids: I) -> Result<Self, SnapshotError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let ids: Arc<[Arc<str>]> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Err(SnapshotError::Empty);
        }
        Ok(KeySnapshot { ids })
    }

    /// Number of identifiers, at least one.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always `false`; an empty snapshot cannot be built.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[Arc<str>] {
        &self.ids
    }

    /// Draws one identifier uniformly, with replacement.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &Arc<str> {
        &self.ids[rng.gen_range(0..self.ids.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::Record;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn test_empty_is_rejected() {
        let ids: Vec<String> = Vec::new();
        assert!(matches!(
            KeySnapshot::from_ids(ids),
            Err(SnapshotError::Empty)
        ));
    }

    #[test]
    fn test_load_from_empty_store() {
        let store = MemoryStore::new();
        assert!(matches!(
            KeySnapshot::load(&store),
            Err(SnapshotError::Empty)
        ));
    }

    #[test]
    fn test_load_keeps_store_order() {
        let store = MemoryStore::from_records([Record::zeroed("b"), Record::zeroed("a")]);
        let snapshot = KeySnapshot::load(&store).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot.is_empty());
        assert_eq!(&*snapshot.ids()[0], "a");
        assert_eq!(&*snapshot.ids()[1], "b");
    }

    #[test]
    fn test_single_id_always_picked() {
        let snapshot = KeySnapshot::from_ids(["only"]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!(&**snapshot.pick(&mut rng), "only");
        }
    }

    #[test]
    fn test_pick_is_reproducible() {
        let snapshot = KeySnapshot::from_ids(["a", "b", "c", "d"]).unwrap();
        let mut first = StdRng::seed_from_u64(11);
        let mut second = StdRng::seed_from_u64(11);
        let a: Vec<_> = (0..50).map(|_| snapshot.pick(&mut first).clone()).collect();
        let b: Vec<_> = (0..50).map(|_| snapshot.pick(&mut second).clone()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pick_reaches_every_id() {
        let snapshot = KeySnapshot::from_ids(["a", "b", "c", "d"]).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let mut seen: HashMap<Arc<str>, usize> = HashMap::new();
        for _ in 0..4000 {
            *seen.entry(snapshot.pick(&mut rng).clone()).or_default() += 1;
        }
        assert_eq!(seen.len(), 4);
        assert!(seen.values().all(|&n| n > 700));
    }
}
