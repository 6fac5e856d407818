//! Datastore capability interface.
//!
//! The harness only needs three things from a datastore: take an exclusive
//! lock on one record while reading its counter, write the counter back inside
//! the same transaction, and commit. [`CounterStore`] and [`CounterTx`] are
//! that surface; everything else (pre-run setup, the key snapshot, the
//! verbose dump) is a plain query.
//!
//! Implementations:
//!
//! - [`memory::MemoryStore`] - in-process rows with real per-row locks
//! - [`sql::SqlStore`] - MySQL / PostgreSQL through `sqlx` (feature `sql`)
//!
//! SQL text is kept per datastore family in [`dialect`].

pub mod dialect;
pub mod memory;

#[cfg(feature = "sql")]
pub mod sql;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::Serialize;

/// One row of the `sequences` table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Record {
    pub id: String,
    pub counter: i64,
}

impl Record {
    /// A record with a zero counter.
    pub fn zeroed(id: impl Into<String>) -> Self {
        Record {
            id: id.into(),
            counter: 0,
        }
    }
}

/// Errors raised by a datastore.
///
/// Only [`StoreError::Unavailable`] is fatal to a run; everything else aborts a
/// single job.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The row lock was not granted within the datastore's lock-wait limit.
    #[error("lock wait timed out on {id}")]
    LockTimeout { id: String },

    /// No row with this identifier.
    #[error("record {id} not found")]
    NotFound { id: String },

    /// A write was attempted on a row this transaction does not hold.
    #[error("record {id} is not locked by this transaction")]
    NotLocked { id: String },

    /// No transaction handle could be obtained at all.
    #[error("transaction handle unavailable: {0}")]
    Unavailable(String),

    /// Any other driver failure.
    #[error("{context}: {message}")]
    Driver {
        context: &'static str,
        message: String,
    },
}

impl StoreError {
    pub(crate) fn driver(context: &'static str, err: impl std::fmt::Display) -> Self {
        StoreError::Driver {
            context,
            message: err.to_string(),
        }
    }

    /// Whether this error ends the whole run rather than one job.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// A transactional datastore holding per-record counters.
///
/// Shared by reference between every worker thread.
pub trait CounterStore: Send + Sync {
    /// Opens a transaction.
    ///
    /// When the run cannot continue (pool exhausted, connection gone),
    /// implementations report it as [`StoreError::Unavailable`]. Any other
    /// error aborts only the job that asked.
    fn begin(&self) -> Result<Box<dyn CounterTx + '_>, StoreError>;

    /// Every record identifier, ordered by id.
    fn load_ids(&self) -> Result<Vec<String>, StoreError>;

    /// Every record with its counter, ordered by id.
    fn records(&self) -> Result<Vec<Record>, StoreError>;

    /// Drops all records and inserts `records` in their place.
    fn reset(&self, records: &[Record]) -> Result<(), StoreError>;

    /// Checks that the datastore is reachable.
    fn ping(&self) -> Result<(), StoreError>;
}

/// An open transaction.
///
/// Dropping a transaction without committing rolls it back.
pub trait CounterTx {
    /// Acquires an exclusive row lock on `id` and returns its counter.
    ///
    /// Blocks while another transaction holds the lock.
    fn lock_counter(&mut self, id: &str) -> Result<i64, StoreError>;

    /// Overwrites the counter of a row locked by this transaction.
    fn write_counter(&mut self, id: &str, value: i64) -> Result<(), StoreError>;

    /// Commits and releases every lock.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discards pending writes and releases every lock.
    fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_fatal() {
        assert!(StoreError::Unavailable("pool closed".into()).is_fatal());
        assert!(!StoreError::LockTimeout { id: "a".into() }.is_fatal());
        assert!(!StoreError::NotFound { id: "a".into() }.is_fatal());
        assert!(!StoreError::NotLocked { id: "a".into() }.is_fatal());
        assert!(!StoreError::driver("commit", "deadlock").is_fatal());
    }

    #[test]
    fn test_error_messages() {
        let err = StoreError::driver("commit", "serialization failure");
        assert_eq!(err.to_string(), "commit: serialization failure");
        let err = StoreError::LockTimeout { id: "k1".into() };
        assert_eq!(err.to_string(), "lock wait timed out on k1");
    }

    #[test]
    fn test_zeroed_record() {
        let record = Record::zeroed("abc");
        assert_eq!(record.id, "abc");
        assert_eq!(record.counter, 0);
    }
}
