//! Latency stream reduction.
//!
//! A single [`ResponseAggregator`] drains the response queue. It is the only
//! owner of the running statistics, so nothing here is shared or atomic.
//! Samples arrive in commit-completion order, which has nothing to do with the
//! order jobs were dispatched in; the statistics never rely on either.
//!
//! Every sample is quantised to the configured [`Resolution`] before it is
//! counted, the way a whole-millisecond timer would report it. Zero is a
//! perfectly good latency at coarse resolutions, so the running minimum starts
//! out *unset* rather than at zero.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::Duration;

use crossbeam_channel::Receiver;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::histogram::Histogram;

/// Default number of histogram buckets.
pub const DEFAULT_BUCKETS: usize = 10;

/// Wall-clock time of one committed critical section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LatencySample(Duration);

impl LatencySample {
    pub fn new(elapsed: Duration) -> Self {
        LatencySample(elapsed)
    }

    pub fn elapsed(&self) -> Duration {
        self.0
    }
}

/// Unit latencies are counted and reported in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "lowercase"))]
pub enum Resolution {
    Nanos,
    Micros,
    #[default]
    Millis,
    Seconds,
}

impl Resolution {
    /// Whole units in `elapsed`, truncated.
    ///
    /// ```rust
    /// use contesa::aggregator::Resolution;
    /// use std::time::Duration;
    ///
    /// assert_eq!(Resolution::Millis.units(Duration::from_micros(2_999)), 2);
    /// assert_eq!(Resolution::Micros.units(Duration::from_micros(2_999)), 2_999);
    /// ```
    pub fn units(self, elapsed: Duration) -> u64 {
        let units = match self {
            Resolution::Nanos => elapsed.as_nanos(),
            Resolution::Micros => elapsed.as_micros(),
            Resolution::Millis => elapsed.as_millis(),
            Resolution::Seconds => u128::from(elapsed.as_secs()),
        };
        u64::try_from(units).unwrap_or(u64::MAX)
    }

    /// Unit suffix used in reports.
    pub fn suffix(self) -> &'static str {
        match self {
            Resolution::Nanos => "ns",
            Resolution::Micros => "us",
            Resolution::Millis => "ms",
            Resolution::Seconds => "s",
        }
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ns" => Ok(Resolution::Nanos),
            "us" => Ok(Resolution::Micros),
            "ms" => Ok(Resolution::Millis),
            "s" => Ok(Resolution::Seconds),
            other => Err(format!("unknown resolution {other:?} (expected ns, us, ms or s)")),
        }
    }
}

/// Running count, extrema and sum.
///
/// # Examples
///
/// ```rust
/// use contesa::aggregator::LatencyStats;
///
/// let mut stats = LatencyStats::default();
/// assert_eq!(stats.min(), None);
///
/// stats.observe(0);
/// stats.observe(4);
/// assert_eq!(stats.min(), Some(0));
/// assert_eq!(stats.max(), Some(4));
/// assert_eq!(stats.mean(), Some(2.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatencyStats {
    count: u64,
    min: Option<u64>,
    max: Option<u64>,
    sum: u128,
}

impl LatencyStats {
    pub fn observe(&mut self, value: u64) {
        self.count += 1;
        self.min = Some(self.min.map_or(value, |min| min.min(value)));
        self.max = Some(self.max.map_or(value, |max| max.max(value)));
        self.sum += u128::from(value);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Smallest value seen, `None` before the first one.
    pub fn min(&self) -> Option<u64> {
        self.min
    }

    pub fn max(&self) -> Option<u64> {
        self.max
    }

    pub fn sum(&self) -> u128 {
        self.sum
    }

    /// Arithmetic mean, `None` when nothing was observed.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }
}

/// Final statistics of a run, in [`Resolution`] units.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct RunStatistics {
    pub count: u64,
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub mean: Option<f64>,
    #[cfg_attr(feature = "serde", serde(rename = "unit"))]
    pub resolution: Resolution,
    pub histogram: Histogram,
}

/// Single consumer of the response queue.
#[derive(Debug)]
pub struct ResponseAggregator {
    stats: LatencyStats,
    samples: Vec<u64>,
    resolution: Resolution,
    buckets: usize,
}

impl ResponseAggregator {
    pub fn new(resolution: Resolution) -> Self {
        ResponseAggregator {
            stats: LatencyStats::default(),
            samples: Vec::with_capacity(1000),
            resolution,
            buckets: DEFAULT_BUCKETS,
        }
    }

    /// Sets the histogram bucket count.
    pub fn with_buckets(mut self, buckets: usize) -> Self {
        self.buckets = buckets;
        self
    }

    /// Folds one sample into the running statistics.
    pub fn observe(&mut self, sample: LatencySample) {
        let value = self.resolution.units(sample.elapsed());
        self.stats.observe(value);
        self.samples.push(value);
    }

    /// Consumes samples until the queue is closed and empty, then finishes.
    pub fn drain(mut self, responses: Receiver<LatencySample>) -> RunStatistics {
        for sample in responses.iter() {
            self.observe(sample);
        }
        debug!(samples = self.stats.count(), "response queue closed");
        self.finish()
    }

    /// Computes the final statistics and histogram.
    pub fn finish(self) -> RunStatistics {
        RunStatistics {
            count: self.samples.len() as u64,
            min: self.stats.min(),
            max: self.stats.max(),
            mean: self.stats.mean(),
            resolution: self.resolution,
            histogram: Histogram::linear(&self.samples, self.buckets),
        }
    }
}
