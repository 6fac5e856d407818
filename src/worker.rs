//! The worker pool.
//!
//! Each worker is an OS thread that loops over the job queue:
//!
//! ```text
//!   recv job ──► begin ──► lock + read ──► write counter+1 ──► commit ──► send sample
//!      ▲           │            │                 │               │            │
//!      │           └─ fatal     └──────── rollback, log, count ───┘            │
//!      └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The locked read and the write share one transaction, so two workers on the
//! same identifier are serialised by the row lock and the later one sees the
//! earlier one's committed value. The measured time starts before `begin` and
//! stops after `commit`, lock wait included: that wait is what the harness is
//! characterising.
//!
//! A failed job is rolled back and dropped. It is never retried and emits no
//! sample, so the sample count can trail the job count. A `begin` that fails
//! with a fatal [`StoreError`] stops that worker with a [`WorkerError`], which
//! fails the run once the pool has drained; any other `begin` error aborts
//! just that job.
//!
//! The pool's only termination signal is the job queue closing: a worker exits
//! once it sees the queue closed and empty. [`WorkerPool::join`] waits for every
//! worker and hands back a [`PoolDrained`] token; nothing else can produce one.

use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::aggregator::LatencySample;
use crate::counters::RunCounters;
use crate::dispatcher::Job;
use crate::error::{BenchError, Result};
use crate::store::{CounterStore, StoreError};

/// Conditions that stop a worker before the job queue is drained.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker {worker}: transaction handle unavailable: {source}")]
    Begin {
        worker: usize,
        #[source]
        source: StoreError,
    },

    #[error("worker {worker}: response queue closed while the pool was still running")]
    ResponsesClosed { worker: usize },
}

/// What every worker shares.
#[derive(Clone, Copy)]
pub struct WorkerContext<'a> {
    pub store: &'a dyn CounterStore,
    pub counters: &'a RunCounters,
    /// Committed updates slower than this are logged.
    pub warn_threshold: Duration,
}

/// Per-worker totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub committed: u64,
    pub failed: u64,
}

/// Proof that every worker has exited.
///
/// Only [`WorkerPool::join`] creates one; the response queue is only closed
/// against it.
#[derive(Debug)]
pub struct PoolDrained {
    workers: usize,
    committed: u64,
    failed: u64,
}

impl PoolDrained {
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn committed(&self) -> u64 {
        self.committed
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }
}

/// A fixed set of running workers.
pub struct WorkerPool<'scope> {
    handles: Vec<ScopedJoinHandle<'scope, std::result::Result<WorkerReport, WorkerError>>>,
}

impl<'scope> WorkerPool<'scope> {
    /// Starts `workers` threads inside `scope`.
    ///
    /// Each worker gets its own clone of `jobs` and `samples`; the caller's
    /// handles are not kept, so the job queue disconnects as soon as every
    /// worker is gone.
    pub fn spawn<'env>(
        scope: &'scope Scope<'scope, 'env>,
        workers: usize,
        ctx: WorkerContext<'env>,
        jobs: Receiver<Job>,
        samples: &Sender<LatencySample>,
    ) -> Result<Self> {
        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let jobs = jobs.clone();
            let samples = samples.clone();
            let handle = thread::Builder::new()
                .name(format!("worker-{index}"))
                .spawn_scoped(scope, move || run_worker(index, ctx, jobs, samples))
                .map_err(|source| BenchError::Spawn {
                    role: "worker",
                    source,
                })?;
            handles.push(handle);
        }
        Ok(WorkerPool { handles })
    }

    /// Number of workers started.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every worker to exit.
    ///
    /// All workers are joined even when one of them failed; the first failure
    /// is returned afterwards.
    pub fn join(self) -> Result<PoolDrained> {
        let workers = self.handles.len();
        let mut drained = PoolDrained {
            workers,
            committed: 0,
            failed: 0,
        };
        let mut first_error: Option<BenchError> = None;

        for handle in self.handles {
            match handle.join() {
                Ok(Ok(report)) => {
                    drained.committed += report.committed;
                    drained.failed += report.failed;
                }
                Ok(Err(err)) => {
                    first_error.get_or_insert(err.into());
                }
                Err(_) => {
                    first_error.get_or_insert(BenchError::Panicked("worker"));
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                debug!(workers, committed = drained.committed, failed = drained.failed, "worker pool drained");
                Ok(drained)
            }
        }
    }
}

/// Why a single job did not produce a sample.
enum JobError {
    /// The datastore cannot hand out transactions any more.
    Fatal(StoreError),
    /// The job was dropped; any open transaction was rolled back.
    Aborted(StoreError),
}

/// Loops until the job queue is closed and empty.
fn run_worker(
    index: usize,
    ctx: WorkerContext<'_>,
    jobs: Receiver<Job>,
    samples: Sender<LatencySample>,
) -> std::result::Result<WorkerReport, WorkerError> {
    let mut report = WorkerReport::default();

    for job in jobs.iter() {
        match update_counter(ctx.store, job.id()) {
            Ok(elapsed) => {
                report.committed += 1;
                ctx.counters.committed.incr();
                if elapsed > ctx.warn_threshold {
                    ctx.counters.slow.incr();
                    warn!(
                        worker = index,
                        id = job.id(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "slow update"
                    );
                }
                if samples.send(LatencySample::new(elapsed)).is_err() {
                    error!(worker = index, "response queue closed under a live worker");
                    return Err(WorkerError::ResponsesClosed { worker: index });
                }
            }
            Err(JobError::Aborted(err)) => {
                report.failed += 1;
                ctx.counters.failed.incr();
                warn!(worker = index, id = job.id(), error = %err, "update rolled back; job dropped");
            }
            Err(JobError::Fatal(err)) => {
                error!(worker = index, error = %err, "cannot open a transaction; worker stopping");
                return Err(WorkerError::Begin {
                    worker: index,
                    source: err,
                });
            }
        }
    }

    debug!(
        worker = index,
        committed = report.committed,
        failed = report.failed,
        "job queue drained"
    );
    Ok(report)
}

/// Increments one counter under an exclusive row lock.
///
/// Returns the time from `begin` to the end of `commit`.
fn update_counter(store: &dyn CounterStore, id: &str) -> std::result::Result<Duration, JobError> {
    let started = Instant::now();
    let mut tx = store.begin().map_err(|err| {
        if err.is_fatal() {
            JobError::Fatal(err)
        } else {
            JobError::Aborted(err)
        }
    })?;

    let staged = tx
        .lock_counter(id)
        .and_then(|current| tx.write_counter(id, current + 1));
    if let Err(err) = staged {
        if let Err(rollback) = tx.rollback() {
            debug!(id, error = %rollback, "rollback failed");
        }
        return Err(JobError::Aborted(err));
    }

    // A failed commit leaves nothing applied; the handle is gone either way.
    tx.commit().map_err(JobError::Aborted)?;
    Ok(started.elapsed())
}
