//! JSON observer.
//!
//! Serialises a [`Report`] with `serde_json`. Unset statistics (`min`, `max`,
//! `mean` of an empty run) come out as `null`.
//!
//! # Feature Flag
//!
//! ```toml
//! [dependencies]
//! contesa = { version = "0.1", features = ["json"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use contesa::observers::json::JsonObserver;
//!
//! let json = JsonObserver::new().pretty(true).to_json(&report)?;
//! // {
//! //   "statistics": { "count": 1000, "min": 0, "max": 41, "mean": 3.87, "unit": "millis", ... },
//! //   "counters": { "dispatched": 1000, "committed": 1000, "failed": 0, "slow": 0 },
//! //   "timestamp_ms": 1760000000000
//! // }
//! ```

use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use super::{Report, Result};
use crate::store::Record;

/// Configuration for the JSON observer.
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    pub pretty: bool,
    /// Adds `timestamp_ms`, milliseconds since the Unix epoch.
    pub include_timestamp: bool,
}

#[derive(Serialize)]
struct Document<'a> {
    #[serde(flatten)]
    report: &'a Report<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<&'a [Record]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp_ms: Option<u64>,
}

/// Serialises a [`Report`] to JSON.
#[derive(Debug, Clone, Default)]
pub struct JsonObserver {
    config: JsonConfig,
}

impl JsonObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: JsonConfig) -> Self {
        Self { config }
    }

    /// Enables or disables pretty-printing.
    pub fn pretty(mut self, enabled: bool) -> Self {
        self.config.pretty = enabled;
        self
    }

    pub fn include_timestamp(mut self, enabled: bool) -> Self {
        self.config.include_timestamp = enabled;
        self
    }

    /// Serialises `report` to a JSON string.
    pub fn to_json(&self, report: &Report<'_>) -> Result<String> {
        self.encode(report, None)
    }

    /// Serialises `report` together with the final records of a verbose run.
    pub fn to_json_with_records(&self, report: &Report<'_>, records: &[Record]) -> Result<String> {
        self.encode(report, Some(records))
    }

    /// Writes `report` (and `records`, when given) to `w`, newline-terminated.
    pub fn write_to(
        &self,
        report: &Report<'_>,
        records: Option<&[Record]>,
        w: &mut dyn io::Write,
    ) -> Result<()> {
        let json = self.encode(report, records)?;
        writeln!(w, "{json}")?;
        w.flush()?;
        Ok(())
    }

    fn encode(&self, report: &Report<'_>, records: Option<&[Record]>) -> Result<String> {
        let doc = Document {
            report,
            records,
            timestamp_ms: self.config.include_timestamp.then(current_timestamp_ms),
        };
        let json = if self.config.pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        Ok(json)
    }
}

fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::{LatencySample, Resolution, ResponseAggregator, RunStatistics};
    use crate::counters::CounterSnapshot;
    use serde_json::Value;
    use std::time::Duration;

    fn stats(values: &[u64]) -> RunStatistics {
        let mut agg = ResponseAggregator::new(Resolution::Millis).with_buckets(2);
        for &v in values {
            agg.observe(LatencySample::new(Duration::from_millis(v)));
        }
        agg.finish()
    }

    fn counters() -> CounterSnapshot {
        CounterSnapshot {
            dispatched: 3,
            committed: 3,
            failed: 0,
            slow: 1,
        }
    }

    #[test]
    fn test_to_json() {
        let stats = stats(&[1, 2, 6]);
        let json = JsonObserver::new()
            .to_json(&Report::new(&stats, counters()))
            .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["statistics"]["count"], 3);
        assert_eq!(value["statistics"]["min"], 1);
        assert_eq!(value["statistics"]["max"], 6);
        assert_eq!(value["statistics"]["mean"], 3.0);
        assert_eq!(value["statistics"]["unit"], "millis");
        assert_eq!(value["counters"]["slow"], 1);
        assert_eq!(value["statistics"]["histogram"]["buckets"][1]["count"], 1);
        assert!(value.get("timestamp_ms").is_none());
        assert!(value.get("records").is_none());
    }

    #[test]
    fn test_empty_run_has_nulls() {
        let stats = stats(&[]);
        let json = JsonObserver::new()
            .to_json(&Report::new(&stats, counters()))
            .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert!(value["statistics"]["min"].is_null());
        assert!(value["statistics"]["mean"].is_null());
    }

    #[test]
    fn test_pretty_and_timestamp() {
        let stats = stats(&[4]);
        let json = JsonObserver::new()
            .pretty(true)
            .include_timestamp(true)
            .to_json(&Report::new(&stats, counters()))
            .unwrap();
        assert!(json.contains('\n'));
        let value: Value = serde_json::from_str(&json).unwrap();
        assert!(value["timestamp_ms"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_records_included() {
        let stats = stats(&[4]);
        let records = [Record {
            id: "a".into(),
            counter: 3,
        }];
        let mut buf = Vec::new();
        JsonObserver::new()
            .write_to(&Report::new(&stats, counters()), Some(&records), &mut buf)
            .unwrap();
        let value: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["records"][0]["id"], "a");
        assert_eq!(value["records"][0]["counter"], 3);
    }
}
