//! Sharded run tallies shared by the dispatcher and the worker pool.
//!
//! Every worker bumps the same handful of tallies (committed, failed, slow)
//! once per job. A single `AtomicU64` per tally would put every worker on the
//! same cache line right next to the lock contention the harness is trying to
//! measure, so each tally is spread across [`NUM_SHARDS`] cache-padded slots
//! and only summed when the run is reported.
//!
//! ```text
//!                          ┌──────────────────────────────────┐
//!   dispatcher ──incr──►   │ [shard 0] ████████ (CachePadded) │
//!   worker-0   ──incr──►   │ [shard 1] ████████ (CachePadded) │
//!   worker-1   ──incr──►   │ [shard 2] ████████ (CachePadded) │
//!        ...               │    ...                           │
//!                          └──────────────────────────────────┘
//!                                          │
//!                                          ▼
//!                                 total() sums every shard
//! ```
//!
//! Shards are handed out round-robin, one per thread, on first use.

use std::fmt::{self, Debug, Display};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Number of shards per tally.
///
/// Workers beyond this count share shards; the totals stay exact.
pub(crate) const NUM_SHARDS: usize = 64;

static NEXT_SHARD: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static SHARD_INDEX: usize = NEXT_SHARD.fetch_add(1, Ordering::Relaxed) % NUM_SHARDS;
}

/// A monotonically increasing, lock-free tally.
///
/// # Examples
///
/// ```rust
/// use contesa::counters::Tally;
///
/// let committed = Tally::new("committed");
/// committed.incr();
/// committed.add(4);
/// assert_eq!(committed.total(), 5);
/// assert_eq!(committed.to_string(), "committed:5");
/// ```
pub struct Tally {
    name: &'static str,
    shards: [CachePadded<AtomicU64>; NUM_SHARDS],
}

impl Tally {
    /// Creates a zeroed tally.
    pub const fn new(name: &'static str) -> Self {
        const ZERO: CachePadded<AtomicU64> = CachePadded::new(AtomicU64::new(0));
        Tally {
            name,
            shards: [ZERO; NUM_SHARDS],
        }
    }

    #[inline]
    fn local_shard(&self) -> &AtomicU64 {
        SHARD_INDEX.with(|idx| &*self.shards[*idx])
    }

    /// Adds one.
    #[inline]
    pub fn incr(&self) {
        self.add(1);
    }

    /// Adds `n` to the calling thread's shard.
    #[inline]
    pub fn add(&self, n: u64) {
        self.local_shard().fetch_add(n, Ordering::Relaxed);
    }

    /// Sums every shard.
    ///
    /// Only exact once the writers have been joined; while the run is live it
    /// is a lower bound.
    pub fn total(&self) -> u64 {
        self.shards
            .iter()
            .map(|shard| shard.load(Ordering::Relaxed))
            .sum()
    }

    /// Returns the tally name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.total())
    }
}

impl Debug for Tally {
    /// Shows only the shards that have been written to.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.name)?;
        for (i, shard) in self.shards.iter().enumerate() {
            let val = shard.load(Ordering::Relaxed);
            if val != 0 {
                write!(f, " [{i}]:{val}")?;
            }
        }
        write!(f, " }}")
    }
}

/// The tallies of one run.
///
/// `dispatched` is written by the dispatcher, everything else by the
/// workers. Failed jobs are never retried; they only show up here.
#[derive(Debug)]
pub struct RunCounters {
    /// Jobs pushed into the job queue.
    pub dispatched: Tally,
    /// Jobs whose transaction committed.
    pub committed: Tally,
    /// Jobs rolled back and dropped.
    pub failed: Tally,
    /// Committed jobs slower than the warning threshold.
    pub slow: Tally,
}

impl RunCounters {
    /// Creates a zeroed set of tallies.
    pub const fn new() -> Self {
        RunCounters {
            dispatched: Tally::new("dispatched"),
            committed: Tally::new("committed"),
            failed: Tally::new("failed"),
            slow: Tally::new("slow"),
        }
    }

    /// Returns the tallies in report order.
    pub fn iter(&self) -> impl Iterator<Item = &Tally> {
        [&self.dispatched, &self.committed, &self.failed, &self.slow].into_iter()
    }

    /// Reads every tally.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            dispatched: self.dispatched.total(),
            committed: self.committed.total(),
            failed: self.failed.total(),
            slow: self.slow.total(),
        }
    }
}

impl Default for RunCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain copy of [`RunCounters`] taken after the pool has drained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct CounterSnapshot {
    pub dispatched: u64,
    pub committed: u64,
    pub failed: u64,
    pub slow: u64,
}

impl CounterSnapshot {
    /// Every dispatched job either committed or failed.
    ///
    /// ```rust
    /// use contesa::counters::CounterSnapshot;
    ///
    /// let snap = CounterSnapshot { dispatched: 100, committed: 90, failed: 10, slow: 0 };
    /// assert!(snap.is_balanced());
    /// ```
    pub fn is_balanced(&self) -> bool {
        self.committed + self.failed == self.dispatched
    }
}
