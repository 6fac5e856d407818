//! Run orchestration and shutdown ordering.
//!
//! ```text
//!                 job queue (cap 2)              response queue (cap 1)
//!  dispatcher ──────────────────────► workers ─────────────────────────► aggregator
//!      │                                 │                                    │
//!      └─ drops sender after M jobs      │                                    │
//!                                        └─ exit when queue closed + empty    │
//!                                                     │                       │
//!                          ShutdownCoordinator ◄──────┘ PoolDrained           │
//!                                 │                                           │
//!                                 └─ drops last response sender ──────────────┘
//! ```
//!
//! The response queue has many producers, so no worker may close it. The
//! [`ShutdownCoordinator`] holds the one sender that outlives the workers and
//! drops it only in exchange for a [`PoolDrained`] token, which only
//! [`WorkerPool::join`] can produce. Closing the response queue before every
//! worker is done is therefore not expressible.

use std::thread::{self, Scope, ScopedJoinHandle};

use crossbeam_channel::{bounded, Sender};
use rand::Rng;
use tracing::{debug, info};

use crate::aggregator::{LatencySample, ResponseAggregator, RunStatistics};
use crate::config::RunConfig;
use crate::counters::{CounterSnapshot, RunCounters};
use crate::dispatcher::{Job, JobDispatcher};
use crate::error::{BenchError, Result};
use crate::snapshot::KeySnapshot;
use crate::store::{CounterStore, Record};
use crate::worker::{PoolDrained, WorkerContext, WorkerPool};

/// Owner of the response queue's closing.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    responses: Sender<LatencySample>,
}

impl ShutdownCoordinator {
    pub fn new(responses: Sender<LatencySample>) -> Self {
        ShutdownCoordinator { responses }
    }

    /// Sender to clone for the workers.
    pub fn responses(&self) -> &Sender<LatencySample> {
        &self.responses
    }

    /// Closes the response queue once the pool has drained.
    ///
    /// The aggregator sees the close after it has taken every sample already
    /// in the queue.
    pub fn close_responses(self, drained: &PoolDrained) {
        drop(self.responses);
        debug!(workers = drained.workers(), "response queue closed");
    }
}

/// What a completed run hands back.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub statistics: RunStatistics,
    pub counters: CounterSnapshot,
    /// Every record's counter after the pool drained; only filled in verbose
    /// runs.
    pub final_records: Option<Vec<Record>>,
}

/// One run of the pipeline against a store.
///
/// # Examples
///
/// ```rust
/// use contesa::config::RunConfig;
/// use contesa::coordinator::BenchRun;
/// use contesa::store::memory::MemoryStore;
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let store = MemoryStore::with_records(4);
/// let config = RunConfig::default().with_workers(4).with_jobs(200);
///
/// let outcome = BenchRun::new(&store, &config)
///     .execute(StdRng::seed_from_u64(7))
///     .unwrap();
///
/// assert_eq!(outcome.statistics.count, 200);
/// assert!(outcome.counters.is_balanced());
/// ```
pub struct BenchRun<'a> {
    store: &'a dyn CounterStore,
    config: &'a RunConfig,
}

impl<'a> BenchRun<'a> {
    pub fn new(store: &'a dyn CounterStore, config: &'a RunConfig) -> Self {
        BenchRun { store, config }
    }

    /// Runs the whole pipeline to completion.
    ///
    /// Returns once the aggregator has consumed the last sample. A worker that
    /// could not open a transaction fails the run, but only after the other
    /// workers have drained the queue, so no thread is left blocked.
    pub fn execute<R: Rng + Send>(&self, rng: R) -> Result<RunOutcome> {
        let config = self.config;
        config.validate()?;

        let snapshot = KeySnapshot::load(self.store)?;
        info!(
            records = snapshot.len(),
            jobs = config.jobs,
            workers = config.workers,
            backend = %config.backend,
            "run starting"
        );

        let counters = RunCounters::new();
        let (job_tx, job_rx) = bounded::<Job>(config.job_queue_capacity);
        let (sample_tx, sample_rx) = bounded::<LatencySample>(config.response_queue_capacity);

        let (statistics, final_records) = thread::scope(|s| -> Result<_> {
            let aggregator = ResponseAggregator::new(config.resolution)
                .with_buckets(config.histogram_buckets);
            let aggregator = spawn_named(s, "aggregator", move || aggregator.drain(sample_rx))?;

            let coordinator = ShutdownCoordinator::new(sample_tx);
            let ctx = WorkerContext {
                store: self.store,
                counters: &counters,
                warn_threshold: config.warn_threshold,
            };
            // Errors past this point drop the senders on the way out, so the
            // scope can still join whatever was spawned.
            let pool = WorkerPool::spawn(s, config.workers, ctx, job_rx, coordinator.responses())?;

            let dispatcher = JobDispatcher::new(&snapshot, rng, config.jobs);
            let counters = &counters;
            let dispatcher = spawn_named(s, "dispatcher", move || dispatcher.dispatch(job_tx, counters))?;

            let dispatched = dispatcher
                .join()
                .map_err(|_| BenchError::Panicked("dispatcher"))?;
            debug!(dispatched, "dispatcher finished");

            let drained = pool.join()?;

            // Taken while no worker can write and before the report exists.
            let final_records = if config.verbose {
                Some(self.store.records()?)
            } else {
                None
            };

            coordinator.close_responses(&drained);
            let statistics = aggregator
                .join()
                .map_err(|_| BenchError::Panicked("aggregator"))?;
            Ok((statistics, final_records))
        })?;

        let counters = counters.snapshot();
        info!(
            committed = counters.committed,
            failed = counters.failed,
            slow = counters.slow,
            "run finished"
        );

        Ok(RunOutcome {
            statistics,
            counters,
            final_records,
        })
    }
}

fn spawn_named<'scope, 'env, F, T>(
    scope: &'scope Scope<'scope, 'env>,
    role: &'static str,
    f: F,
) -> Result<ScopedJoinHandle<'scope, T>>
where
    F: FnOnce() -> T + Send + 'scope,
    T: Send + 'scope,
{
    thread::Builder::new()
        .name(role.to_string())
        .spawn_scoped(scope, f)
        .map_err(|source| BenchError::Spawn { role, source })
}
