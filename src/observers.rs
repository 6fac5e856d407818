//! Report rendering.
//!
//! A finished run is turned into a [`Report`] and handed to one of the
//! observers:
//!
//! - [`text`] - the plain report with an inline histogram (always available)
//! - [`table`] - the same figures as `tabled` tables
//! - [`json`] - statistics and counters serialised with `serde_json`
//!
//! # Unified Error Handling
//!
//! Every observer fails with the same [`ObserverError`], so the caller can switch
//! output format without touching its error handling.
//!
//! # Feature Flags
//!
//! - `table` - enables the [`table`] module
//! - `json` - enables the [`json`] module
//! - `full` - enables both (plus the SQL backends)
//!
//! # Example
//!
//! ```rust
//! use contesa::config::RunConfig;
//! use contesa::coordinator::BenchRun;
//! use contesa::observers::text::TextObserver;
//! use contesa::observers::Report;
//! use contesa::store::memory::MemoryStore;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let store = MemoryStore::with_records(2);
//! let config = RunConfig::default().with_jobs(20);
//! let outcome = BenchRun::new(&store, &config)
//!     .execute(StdRng::seed_from_u64(1))
//!     .unwrap();
//!
//! let text = TextObserver::new().render(&Report::from(&outcome));
//! assert!(text.starts_with("Count: 20\n"));
//! ```

mod error;

pub use error::{ObserverError, Result};

pub mod text;

#[cfg(feature = "table")]
pub mod table;

#[cfg(feature = "json")]
pub mod json;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::aggregator::RunStatistics;
use crate::coordinator::RunOutcome;
use crate::counters::CounterSnapshot;

/// Everything an observer renders.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Report<'a> {
    pub statistics: &'a RunStatistics,
    pub counters: CounterSnapshot,
}

impl<'a> Report<'a> {
    pub fn new(statistics: &'a RunStatistics, counters: CounterSnapshot) -> Self {
        Report {
            statistics,
            counters,
        }
    }
}

impl<'a> From<&'a RunOutcome> for Report<'a> {
    fn from(outcome: &'a RunOutcome) -> Self {
        Report::new(&outcome.statistics, outcome.counters)
    }
}

/// Formats an optional value with its unit, `-` when unset.
pub(crate) fn with_unit<T: std::fmt::Display>(value: Option<T>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v} {unit}"),
        None => "-".to_string(),
    }
}
