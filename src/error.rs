//! Crate-level error type.
//!
//! Only failures that end a run live here. A transaction that fails on one job
//! is rolled back inside the worker, logged and counted, and never reaches this
//! type.

use thiserror::Error;

use crate::observers::ObserverError;
use crate::snapshot::SnapshotError;
use crate::store::StoreError;
use crate::worker::WorkerError;

/// Everything that can stop a run.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Missing or invalid parameters; raised before any work starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// The datastore cannot be reached.
    #[error("connection error: {0}")]
    Connect(#[source] StoreError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// The final report could not be written.
    #[error("report error: {0}")]
    Report(#[from] ObserverError),

    #[error("cannot spawn {role} thread: {source}")]
    Spawn {
        role: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} thread panicked")]
    Panicked(&'static str),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            BenchError::Config("workers must be at least 1".into()).to_string(),
            "configuration error: workers must be at least 1"
        );
        assert_eq!(
            BenchError::Panicked("aggregator").to_string(),
            "aggregator thread panicked"
        );
        let err = BenchError::Connect(StoreError::driver("connect", "refused"));
        assert_eq!(err.to_string(), "connection error: connect: refused");
    }

    #[test]
    fn test_store_error_converts() {
        let err: BenchError = StoreError::NotFound { id: "x".into() }.into();
        assert!(matches!(err, BenchError::Store(_)));
    }
}
