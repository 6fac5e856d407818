//! # Contesa - Contended Row-Lock Update Latency Harness
//!
//! A load generator that measures how long a transactional datastore takes to
//! perform read-modify-write updates when many clients fight over the same
//! rows. Every update takes an exclusive row lock, reads a counter, writes it
//! back incremented and commits; the harness records the wall-clock time of
//! that whole critical section and reports the distribution.
//!
//! ## The Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐  job queue  ┌──────────────┐ response queue ┌────────────────────┐
//! │ KeySnapshot  │──►│ JobDispatcher  │────(2)─────►│ WorkerPool   │──────(1)──────►│ ResponseAggregator │
//! │ (K ids)      │   │ (M random ids) │             │ (W threads)  │                │ (min/max/mean/hist)│
//! └──────────────┘   └────────────────┘             └──────┬───────┘                └─────────┬──────────┘
//!                                                          │ lock + read + write + commit     │
//!                                                          ▼                                  ▼
//!                                                   ┌──────────────┐                  ┌──────────────┐
//!                                                   │ CounterStore │                  │   Observer   │
//!                                                   └──────────────┘                  └──────────────┘
//! ```
//!
//! Both queues are tiny, so the dispatcher can never run far ahead of the
//! workers and the aggregator applies backpressure to them in turn. Each queue
//! is closed exactly once, by dropping the last sender: the dispatcher closes
//! the job queue after its last job, and the
//! [`ShutdownCoordinator`](coordinator::ShutdownCoordinator) closes the
//! response queue once every worker has exited.
//!
//! ## Invariants
//!
//! 1. **No lost updates**: at the end of a run, the sum of all counter
//!    increments equals the number of committed jobs.
//! 2. **One sample per commit**: failed jobs are rolled back, counted and
//!    dropped; they never emit a latency.
//! 3. **Bounded connections**: a store never holds more than
//!    `max_connections` connections at once.
//!
//! ## Quick Start
//!
//! ```rust
//! use contesa::config::RunConfig;
//! use contesa::coordinator::BenchRun;
//! use contesa::store::memory::MemoryStore;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! // Four records, four workers, two hundred updates.
//! let store = MemoryStore::with_records(4);
//! let config = RunConfig::default().with_workers(4).with_jobs(200);
//!
//! let outcome = BenchRun::new(&store, &config)
//!     .execute(StdRng::seed_from_u64(42))
//!     .unwrap();
//!
//! assert_eq!(outcome.statistics.count, 200);
//! assert_eq!(outcome.counters.committed, 200);
//! ```
//!
//! ## Datastores
//!
//! | Backend | Module | Feature |
//! |---------|--------|---------|
//! | in-process | [`store::memory`] | always |
//! | MySQL / PostgreSQL | `store::sql` | `sql` |
//!
//! The SQL backends go through `sqlx`'s Any driver on a private `tokio`
//! runtime; workers stay plain OS threads and block on each statement.
//!
//! ## Observers
//!
//! | Feature | Module | Description |
//! |---------|--------|-------------|
//! | always | [`observers::text`] | Plain report with an inline histogram |
//! | `table` | `observers::table` | Summary and histogram as ASCII tables |
//! | `json` | `observers::json` | Statistics and counters as JSON |
//! | `full` | all of the above | Plus the SQL backends |
//!
//! ## Logging
//!
//! The library logs through `tracing` and never installs a subscriber. Slow
//! updates and rolled-back jobs are `warn` events; queue closings are `debug`.

pub mod aggregator;
pub mod config;
pub mod coordinator;
pub mod counters;
pub mod dispatcher;
pub mod error;
pub mod histogram;
pub mod observers;
pub mod seed;
pub mod snapshot;
pub mod store;
pub mod worker;

pub use error::{BenchError, Result};
