//! In-process datastore with real per-row exclusive locks.
//!
//! Each row is an `Arc<Mutex<i64>>`. A transaction that locks a row keeps the
//! owned guard until it commits or rolls back, so a second transaction on the
//! same identifier blocks exactly like `SELECT ... FOR UPDATE` would. Writes
//! are staged and only land in the row on commit.
//!
//! Besides the plain store, [`MemoryStore`] can model the parts of a real
//! datastore the harness cares about:
//!
//! - a lock-wait limit ([`MemoryStore::with_lock_wait`])
//! - time spent inside the critical section ([`MemoryStore::with_write_delay`])
//! - a bounded connection pool ([`MemoryStore::with_max_connections`])
//! - injected lock timeouts, commit failures and begin failures
//!
//! # Examples
//!
//! ```rust
//! use contesa::store::memory::MemoryStore;
//! use contesa::store::{CounterStore, Record};
//!
//! let store = MemoryStore::from_records([Record::zeroed("a")]);
//!
//! let mut tx = store.begin().unwrap();
//! let current = tx.lock_counter("a").unwrap();
//! tx.write_counter("a", current + 1).unwrap();
//! tx.commit().unwrap();
//!
//! assert_eq!(store.counter("a"), Some(1));
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RawMutex, RwLock};

use super::{CounterStore, CounterTx, Record, StoreError};

type Row = Arc<Mutex<i64>>;
type RowGuard = lock_api::ArcMutexGuard<RawMutex, i64>;

/// One-shot failures consumed in order by the transactions that hit them.
#[derive(Debug, Default)]
struct Faults {
    lock_timeouts: AtomicUsize,
    commit_failures: AtomicUsize,
    begin_failures: AtomicUsize,
}

impl Faults {
    /// Consumes one pending fault, if any.
    fn take(slot: &AtomicUsize) -> bool {
        slot.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Counting bound on concurrently open transactions.
#[derive(Debug)]
struct Connections {
    limit: Option<usize>,
    open: Mutex<usize>,
    released: Condvar,
    peak: AtomicUsize,
}

impl Connections {
    fn new(limit: Option<usize>) -> Self {
        Connections {
            limit,
            open: Mutex::new(0),
            released: Condvar::new(),
            peak: AtomicUsize::new(0),
        }
    }

    fn acquire(&self) {
        let mut open = self.open.lock();
        if let Some(limit) = self.limit {
            while *open >= limit {
                self.released.wait(&mut open);
            }
        }
        *open += 1;
        self.peak.fetch_max(*open, Ordering::Relaxed);
    }

    fn release(&self) {
        let mut open = self.open.lock();
        *open -= 1;
        self.released.notify_one();
    }
}

/// In-process [`CounterStore`].
#[derive(Debug)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<String, Row>>,
    lock_wait: Option<Duration>,
    write_delay: Option<Duration>,
    connections: Connections,
    faults: Faults,
}

impl MemoryStore {
    /// An empty store with no lock-wait limit and no connection bound.
    pub fn new() -> Self {
        MemoryStore {
            rows: RwLock::new(BTreeMap::new()),
            lock_wait: None,
            write_delay: None,
            connections: Connections::new(None),
            faults: Faults::default(),
        }
    }

    /// A store holding `records`.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::new();
        store.replace(records);
        store
    }

    /// A store seeded with `count` zeroed records under fresh identifiers.
    pub fn with_records(count: usize) -> Self {
        Self::from_records(crate::seed::generate_records(count))
    }

    /// Gives up on a row lock after `wait`, surfacing
    /// [`StoreError::LockTimeout`].
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = Some(wait);
        self
    }

    /// Sleeps for `delay` inside every counter write, while the row is locked.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Blocks `begin` while `limit` transactions are already open.
    ///
    /// A limit of zero is treated as one.
    pub fn with_max_connections(mut self, limit: usize) -> Self {
        self.connections = Connections::new(Some(limit.max(1)));
        self
    }

    /// The next `n` lock attempts fail with [`StoreError::LockTimeout`].
    pub fn inject_lock_timeouts(&self, n: usize) {
        self.faults.lock_timeouts.fetch_add(n, Ordering::AcqRel);
    }

    /// The next `n` commits fail and roll back.
    pub fn inject_commit_failures(&self, n: usize) {
        self.faults.commit_failures.fetch_add(n, Ordering::AcqRel);
    }

    /// The next `n` calls to `begin` fail with [`StoreError::Unavailable`].
    pub fn inject_begin_failures(&self, n: usize) {
        self.faults.begin_failures.fetch_add(n, Ordering::AcqRel);
    }

    /// Committed counter of `id`.
    ///
    /// Blocks while a transaction holds the row.
    pub fn counter(&self, id: &str) -> Option<i64> {
        self.rows.read().get(id).map(|row| *row.lock())
    }

    /// Highest number of transactions that were open at the same time.
    pub fn peak_connections(&self) -> usize {
        self.connections.peak.load(Ordering::Relaxed)
    }

    fn replace(&self, records: impl IntoIterator<Item = Record>) {
        let rows = records
            .into_iter()
            .map(|record| (record.id, Arc::new(Mutex::new(record.counter))))
            .collect();
        *self.rows.write() = rows;
    }

    fn row(&self, id: &str) -> Result<Row, StoreError> {
        self.rows
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_owned() })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterStore for MemoryStore {
    fn begin(&self) -> Result<Box<dyn CounterTx + '_>, StoreError> {
        if Faults::take(&self.faults.begin_failures) {
            return Err(StoreError::Unavailable("injected begin failure".into()));
        }
        self.connections.acquire();
        Ok(Box::new(MemoryTx {
            store: self,
            held: None,
        }))
    }

    fn load_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.rows.read().keys().cloned().collect())
    }

    fn records(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .rows
            .read()
            .iter()
            .map(|(id, row)| Record {
                id: id.clone(),
                counter: *row.lock(),
            })
            .collect())
    }

    fn reset(&self, records: &[Record]) -> Result<(), StoreError> {
        self.replace(records.iter().cloned());
        Ok(())
    }

    fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// The row a transaction has locked, plus its staged write.
struct Held {
    id: String,
    guard: RowGuard,
    pending: Option<i64>,
}

struct MemoryTx<'a> {
    store: &'a MemoryStore,
    held: Option<Held>,
}

impl CounterTx for MemoryTx<'_> {
    fn lock_counter(&mut self, id: &str) -> Result<i64, StoreError> {
        if let Some(held) = &self.held {
            if held.id == id {
                return Ok(held.pending.unwrap_or(*held.guard));
            }
            return Err(StoreError::driver(
                "lock counter",
                format!("transaction already holds {}", held.id),
            ));
        }
        if Faults::take(&self.store.faults.lock_timeouts) {
            return Err(StoreError::LockTimeout { id: id.to_owned() });
        }

        let row = self.store.row(id)?;
        let guard = match self.store.lock_wait {
            Some(wait) => row
                .try_lock_arc_for(wait)
                .ok_or_else(|| StoreError::LockTimeout { id: id.to_owned() })?,
            None => row.lock_arc(),
        };
        let current = *guard;
        self.held = Some(Held {
            id: id.to_owned(),
            guard,
            pending: None,
        });
        Ok(current)
    }

    fn write_counter(&mut self, id: &str, value: i64) -> Result<(), StoreError> {
        let held = match &mut self.held {
            Some(held) if held.id == id => held,
            _ => return Err(StoreError::NotLocked { id: id.to_owned() }),
        };
        if let Some(delay) = self.store.write_delay {
            std::thread::sleep(delay);
        }
        held.pending = Some(value);
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        if Faults::take(&self.store.faults.commit_failures) {
            return Err(StoreError::driver("commit", "injected commit failure"));
        }
        if let Some(mut held) = self.held.take() {
            if let Some(value) = held.pending {
                *held.guard = value;
            }
        }
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

impl Drop for MemoryTx<'_> {
    fn drop(&mut self) {
        // Release the row before the connection slot.
        self.held = None;
        self.store.connections.release();
    }
}
