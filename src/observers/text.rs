//! Plain-text report.
//!
//! ```text
//! Count: 50
//! Min: 3 ms
//! Max: 9 ms
//! Mean: 4.52 ms
//! Committed: 50  Failed: 0  Slow: 0
//! [histogram]
//!      3.0 -      3.6 ms   20.00%  #####  10
//!      3.6 -      4.2 ms   14.00%  ####   7
//! ...
//! ```
//!
//! The fullest bucket gets a bar of exactly `bar_width` cells; every other bar
//! is scaled against it.

use std::fmt::Write as _;
use std::io;

use super::{with_unit, Report, Result};

/// Default bar width of the fullest histogram bucket.
pub const DEFAULT_BAR_WIDTH: usize = 5;

/// Renders a [`Report`] as plain text.
#[derive(Debug, Clone, Copy)]
pub struct TextObserver {
    bar_width: usize,
}

impl Default for TextObserver {
    fn default() -> Self {
        TextObserver {
            bar_width: DEFAULT_BAR_WIDTH,
        }
    }
}

impl TextObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bar width of the fullest bucket. Values below 1 are treated
    /// as 1.
    pub fn with_bar_width(mut self, width: usize) -> Self {
        self.bar_width = width.max(1);
        self
    }

    pub fn render(&self, report: &Report<'_>) -> String {
        let stats = report.statistics;
        let unit = stats.resolution.suffix();
        let mut out = String::new();

        // Writing into a String cannot fail.
        let _ = writeln!(out, "Count: {}", stats.count);
        if stats.count == 0 {
            let _ = writeln!(out, "(no samples)");
        } else {
            let _ = writeln!(out, "Min: {}", with_unit(stats.min, unit));
            let _ = writeln!(out, "Max: {}", with_unit(stats.max, unit));
            let mean = stats.mean.map(|m| format!("{m:.2}"));
            let _ = writeln!(out, "Mean: {}", with_unit(mean, unit));
        }
        let _ = writeln!(
            out,
            "Committed: {}  Failed: {}  Slow: {}",
            report.counters.committed, report.counters.failed, report.counters.slow
        );

        if !stats.histogram.is_empty() {
            let _ = writeln!(out, "[histogram]");
            let total = stats.histogram.total() as f64;
            let fullest = stats.histogram.max_count();
            for bucket in stats.histogram.buckets() {
                let share = bucket.count as f64 * 100.0 / total;
                let bar = "#".repeat(self.bar_cells(bucket.count, fullest));
                let _ = writeln!(
                    out,
                    "{:>8.1} - {:>8.1} {unit}  {share:>6.2}%  {bar:<width$}  {}",
                    bucket.lower,
                    bucket.upper,
                    bucket.count,
                    width = self.bar_width,
                );
            }
        }
        out
    }

    /// Renders `report` into `w`.
    pub fn write_to(&self, report: &Report<'_>, w: &mut dyn io::Write) -> Result<()> {
        w.write_all(self.render(report).as_bytes())?;
        w.flush()?;
        Ok(())
    }

    fn bar_cells(&self, count: u64, fullest: u64) -> usize {
        if fullest == 0 {
            return 0;
        }
        ((count as f64 / fullest as f64) * self.bar_width as f64).round() as usize
    }
}
