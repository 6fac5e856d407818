//! Linear latency histogram.
//!
//! The observed span `[min, max]` is cut into a fixed number of equal-width
//! buckets. Every bucket is half-open except the last, which also holds `max`.
//! When every sample is equal the span is empty and all of them land in the
//! first bucket.
//!
//! # Examples
//!
//! ```rust
//! use contesa::histogram::Histogram;
//!
//! let hist = Histogram::linear(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10], 5);
//! assert_eq!(hist.buckets().len(), 5);
//! assert_eq!(hist.total(), 11);
//! assert_eq!(hist.buckets()[4].count, 3); // 8, 9 and 10
//! ```

#[cfg(feature = "serde")]
use serde::Serialize;

/// One equal-width range of the histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Bucket {
    /// Inclusive lower bound.
    pub lower: f64,
    /// Exclusive upper bound, inclusive for the last bucket.
    pub upper: f64,
    pub count: u64,
}

/// Counts of samples per bucket.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Histogram {
    buckets: Vec<Bucket>,
    total: u64,
}

impl Histogram {
    /// Buckets `values` into `buckets` equal-width ranges over their span.
    ///
    /// No values (or zero buckets) gives an empty histogram.
    pub fn linear(values: &[u64], buckets: usize) -> Self {
        let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
            return Histogram::default();
        };
        if buckets == 0 {
            return Histogram::default();
        }

        let width = (max - min) as f64 / buckets as f64;
        let mut out: Vec<Bucket> = (0..buckets)
            .map(|i| Bucket {
                lower: min as f64 + i as f64 * width,
                upper: min as f64 + (i + 1) as f64 * width,
                count: 0,
            })
            .collect();
        if let Some(last) = out.last_mut() {
            last.upper = max as f64;
        }

        for &value in values {
            let index = if width == 0.0 {
                0
            } else {
                (((value - min) as f64 / width) as usize).min(buckets - 1)
            };
            out[index].count += 1;
        }

        Histogram {
            buckets: out,
            total: values.len() as u64,
        }
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Number of samples bucketed.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Count of the fullest bucket.
    pub fn max_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(hist: &Histogram) -> Vec<u64> {
        hist.buckets().iter().map(|b| b.count).collect()
    }

    #[test]
    fn test_empty() {
        let hist = Histogram::linear(&[], 10);
        assert!(hist.is_empty());
        assert!(hist.buckets().is_empty());
        assert_eq!(hist.max_count(), 0);
    }

    #[test]
    fn test_zero_buckets() {
        let hist = Histogram::linear(&[1, 2, 3], 0);
        assert!(hist.buckets().is_empty());
    }

    #[test]
    fn test_constant_samples_land_in_first_bucket() {
        let hist = Histogram::linear(&[4, 4, 4, 4], 10);
        assert_eq!(hist.buckets().len(), 10);
        assert_eq!(hist.buckets()[0].count, 4);
        assert_eq!(hist.total(), 4);
        assert_eq!(hist.max_count(), 4);
    }

    #[test]
    fn test_zero_samples_counted() {
        let hist = Histogram::linear(&[0, 0, 10], 10);
        assert_eq!(hist.buckets()[0].count, 2);
        assert_eq!(hist.buckets()[9].count, 1);
        assert_eq!(hist.buckets()[0].lower, 0.0);
    }

    #[test]
    fn test_linear_ranges() {
        let hist = Histogram::linear(&[10, 20], 4);
        let bounds: Vec<_> = hist.buckets().iter().map(|b| (b.lower, b.upper)).collect();
        assert_eq!(
            bounds,
            [(10.0, 12.5), (12.5, 15.0), (15.0, 17.5), (17.5, 20.0)]
        );
        assert_eq!(counts(&hist), [1, 0, 0, 1]);
    }

    #[test]
    fn test_max_goes_into_last_bucket() {
        let values: Vec<u64> = (0..=100).collect();
        let hist = Histogram::linear(&values, 10);
        assert_eq!(counts(&hist), [10, 10, 10, 10, 10, 10, 10, 10, 10, 11]);
    }

    #[test]
    fn test_counts_sum_to_total() {
        let values = [3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5, 8, 9, 7, 9, 3, 2, 3, 8, 4];
        let hist = Histogram::linear(&values, 10);
        let sum: u64 = hist.buckets().iter().map(|b| b.count).sum();
        assert_eq!(sum, values.len() as u64);
        assert_eq!(hist.total(), values.len() as u64);
    }
}
