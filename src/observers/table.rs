//! Table observer.
//!
//! Renders a [`Report`] as two tables built with the `tabled` crate: a summary
//! and, when there are samples, the histogram.
//!
//! # Feature Flag
//!
//! ```toml
//! [dependencies]
//! contesa = { version = "0.1", features = ["table"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use contesa::observers::table::{TableObserver, TableStyle};
//!
//! let observer = TableObserver::new().with_style(TableStyle::Rounded);
//! println!("{}", observer.render(&report));
//! // ╭───────────┬─────────╮
//! // │ Metric    │ Value   │
//! // ├───────────┼─────────┤
//! // │ Count     │ 1000    │
//! // │ Min       │ 0 ms    │
//! // │ Max       │ 41 ms   │
//! // │ Mean      │ 3.87 ms │
//! // │ Committed │ 1000    │
//! // │ Failed    │ 0       │
//! // │ Slow      │ 0       │
//! // ╰───────────┴─────────╯
//! ```

use tabled::settings::object::Rows;
use tabled::settings::{Remove, Style};
use tabled::{builder::Builder, Table, Tabled};

use super::{with_unit, Report};

/// Available table styles for rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TableStyle {
    /// ASCII table with simple characters: +, -, |
    Ascii,
    /// Modern rounded corners (default)
    #[default]
    Rounded,
    /// Sharp corners with box-drawing characters
    Sharp,
    /// Modern style with clean lines
    Modern,
    /// GitHub-flavored Markdown table
    Markdown,
    /// No borders, just spacing
    Blank,
}

/// Configuration for the table observer.
#[derive(Debug, Clone)]
pub struct TableConfig {
    pub style: TableStyle,
    /// Whether to show the header row.
    pub show_header: bool,
    /// Line printed above the summary table.
    pub title: Option<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            style: TableStyle::default(),
            show_header: true,
            title: None,
        }
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Renders a [`Report`] as formatted tables.
#[derive(Debug, Clone, Default)]
pub struct TableObserver {
    config: TableConfig,
}

impl TableObserver {
    /// Default style is [`TableStyle::Rounded`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self { config }
    }

    pub fn with_style(mut self, style: TableStyle) -> Self {
        self.config.style = style;
        self
    }

    pub fn with_header(mut self, show: bool) -> Self {
        self.config.show_header = show;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    fn apply_style(&self, table: &mut Table) {
        match self.config.style {
            TableStyle::Ascii => {
                table.with(Style::ascii());
            }
            TableStyle::Rounded => {
                table.with(Style::rounded());
            }
            TableStyle::Sharp => {
                table.with(Style::sharp());
            }
            TableStyle::Modern => {
                table.with(Style::modern());
            }
            TableStyle::Markdown => {
                table.with(Style::markdown());
            }
            TableStyle::Blank => {
                table.with(Style::blank());
            }
        }
        if !self.config.show_header {
            table.with(Remove::row(Rows::first()));
        }
    }

    fn summary(&self, report: &Report<'_>) -> Table {
        let stats = report.statistics;
        let unit = stats.resolution.suffix();
        let rows = vec![
            SummaryRow {
                metric: "Count",
                value: stats.count.to_string(),
            },
            SummaryRow {
                metric: "Min",
                value: with_unit(stats.min, unit),
            },
            SummaryRow {
                metric: "Max",
                value: with_unit(stats.max, unit),
            },
            SummaryRow {
                metric: "Mean",
                value: with_unit(stats.mean.map(|m| format!("{m:.2}")), unit),
            },
            SummaryRow {
                metric: "Committed",
                value: report.counters.committed.to_string(),
            },
            SummaryRow {
                metric: "Failed",
                value: report.counters.failed.to_string(),
            },
            SummaryRow {
                metric: "Slow",
                value: report.counters.slow.to_string(),
            },
        ];
        let mut table = Table::new(rows);
        self.apply_style(&mut table);
        table
    }

    fn histogram(&self, report: &Report<'_>) -> Option<Table> {
        let hist = &report.statistics.histogram;
        if hist.is_empty() {
            return None;
        }
        let unit = report.statistics.resolution.suffix();
        let total = hist.total() as f64;

        let mut builder = Builder::default();
        builder.push_record([format!("Range ({unit})"), "Share".into(), "Count".into()]);
        for bucket in hist.buckets() {
            builder.push_record([
                format!("{:.1} - {:.1}", bucket.lower, bucket.upper),
                format!("{:.2}%", bucket.count as f64 * 100.0 / total),
                bucket.count.to_string(),
            ]);
        }
        let mut table = builder.build();
        self.apply_style(&mut table);
        Some(table)
    }

    /// Renders the summary table, followed by the histogram table when the
    /// run produced samples.
    pub fn render(&self, report: &Report<'_>) -> String {
        let mut out = String::new();
        if let Some(ref title) = self.config.title {
            out.push_str(title);
            out.push('\n');
        }
        out.push_str(&self.summary(report).to_string());
        if let Some(hist) = self.histogram(report) {
            out.push('\n');
            out.push_str(&hist.to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{LatencySample, Resolution, ResponseAggregator, RunStatistics};
    use crate::counters::CounterSnapshot;
    use std::time::Duration;

    fn stats(values: &[u64], resolution: Resolution) -> RunStatistics {
        let mut agg = ResponseAggregator::new(resolution).with_buckets(4);
        for &v in values {
            agg.observe(LatencySample::new(Duration::from_micros(v)));
        }
        agg.finish()
    }

    fn counters() -> CounterSnapshot {
        CounterSnapshot {
            dispatched: 4,
            committed: 3,
            failed: 1,
            slow: 2,
        }
    }

    #[test]
    fn test_render_summary() {
        let stats = stats(&[10, 20, 30], Resolution::Micros);
        let output = TableObserver::new().render(&Report::new(&stats, counters()));

        assert!(output.contains("Metric"));
        assert!(output.contains("10 us"));
        assert!(output.contains("30 us"));
        assert!(output.contains("20.00 us"));
        assert!(output.contains("Failed"));
        assert!(output.contains("Range (us)"));
    }

    #[test]
    fn test_render_without_samples() {
        let stats = stats(&[], Resolution::Millis);
        let output = TableObserver::new().render(&Report::new(&stats, counters()));

        assert!(output.contains("Count"));
        assert!(!output.contains("Range"));
        assert!(output.contains(" - "));
    }

    #[test]
    fn test_hidden_header() {
        let stats = stats(&[1], Resolution::Micros);
        let output = TableObserver::new()
            .with_header(false)
            .render(&Report::new(&stats, counters()));
        assert!(!output.contains("Metric"));
        assert!(!output.contains("Range"));
    }

    #[test]
    fn test_title_and_style() {
        let stats = stats(&[1, 2], Resolution::Micros);
        let output = TableObserver::new()
            .with_style(TableStyle::Markdown)
            .with_title("hot record")
            .render(&Report::new(&stats, counters()));
        assert!(output.starts_with("hot record\n"));
        assert!(output.contains('|'));
    }

    #[test]
    fn test_all_styles_render() {
        let stats = stats(&[5, 9], Resolution::Micros);
        let report = Report::new(&stats, counters());
        for style in [
            TableStyle::Ascii,
            TableStyle::Rounded,
            TableStyle::Sharp,
            TableStyle::Modern,
            TableStyle::Markdown,
            TableStyle::Blank,
        ] {
            let output = TableObserver::new().with_style(style).render(&report);
            assert!(output.contains("Count"), "style {style:?}");
        }
    }
}
