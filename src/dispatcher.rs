//! The offered load.
//!
//! [`JobDispatcher`] draws identifiers from a [`KeySnapshot`] and pushes them,
//! one at a time, into the bounded job queue. A full queue blocks the push;
//! that is the only place the pipeline deliberately throttles its producer.
//! Once the last job is in, the dispatcher drops its sender, which is how the
//! queue is closed. Nothing else owns that sender, so the queue can only be
//! closed once.
//!
//! The random source is injected: seed it to replay the exact same key
//! sequence.

use std::fmt::{self, Display};
use std::sync::Arc;

use crossbeam_channel::Sender;
use rand::Rng;
use tracing::{debug, warn};

use crate::counters::RunCounters;
use crate::snapshot::KeySnapshot;

/// One record update to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    id: Arc<str>,
}

impl Job {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Job { id: id.into() }
    }

    /// Identifier of the record to update.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Produces exactly `jobs` jobs into the job queue, then closes it.
///
/// # Examples
///
/// ```rust
/// use contesa::counters::RunCounters;
/// use contesa::dispatcher::JobDispatcher;
/// use contesa::snapshot::KeySnapshot;
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
///
/// let snapshot = KeySnapshot::from_ids(["a", "b"]).unwrap();
/// let counters = RunCounters::new();
/// let (tx, rx) = crossbeam_channel::bounded(16);
///
/// let pushed = JobDispatcher::new(&snapshot, StdRng::seed_from_u64(7), 10).dispatch(tx, &counters);
///
/// assert_eq!(pushed, 10);
/// assert_eq!(rx.iter().count(), 10); // ends because the queue is closed
/// ```
pub struct JobDispatcher<'a, R> {
    snapshot: &'a KeySnapshot,
    rng: R,
    jobs: usize,
}

impl<'a, R: Rng> JobDispatcher<'a, R> {
    pub fn new(snapshot: &'a KeySnapshot, rng: R, jobs: usize) -> Self {
        JobDispatcher {
            snapshot,
            rng,
            jobs,
        }
    }

    /// Pushes every job, blocking while the queue is full, then closes the
    /// queue by dropping `queue`.
    ///
    /// Returns the number of jobs pushed. That is `jobs` unless every worker
    /// exited early, in which case the rest of the load is never offered.
    pub fn dispatch(mut self, queue: Sender<Job>, counters: &RunCounters) -> usize {
        let mut pushed = 0;
        for _ in 0..self.jobs {
            let job = Job {
                id: Arc::clone(self.snapshot.pick(&mut self.rng)),
            };
            if queue.send(job).is_err() {
                warn!(
                    pushed,
                    requested = self.jobs,
                    "every worker has exited; stopping dispatch"
                );
                break;
            }
            counters.dispatched.incr();
            pushed += 1;
        }
        drop(queue);
        debug!(pushed, "job queue closed");
        pushed
    }
}
