use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod parser;
pub mod series;

pub use parser::{parse_line, parse_line_bytes, LineOutcome, ParseStats, SkipReason, TelemetryReader};
pub use series::{MetricSeries, MetricValues, TargetTracker};

/// Tag key carrying the execution stage identifier.
pub const STAGE_TAG: &str = "stage";

/// Tag key carrying the requested URL.
pub const URL_TAG: &str = "url";

/// One timestamped metric measurement taken from the telemetry stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub metric: String,
    pub value: f64,
    pub tags: BTreeMap<String, String>,
}

impl Observation {
    pub fn stage(&self) -> Option<&str> {
        self.tags.get(STAGE_TAG).map(String::as_str)
    }

    pub fn url(&self) -> Option<&str> {
        self.tags.get(URL_TAG).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// MetricNames
// ---------------------------------------------------------------------------

/// Names of the metrics consumed by the analysis.
///
/// k6 emits different names for protocol-level and browser-level runs, so
/// the set is data rather than compiled-in constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricNames {
    /// Trend of response durations in milliseconds.
    pub duration: String,
    /// Rate metric whose points are 1 for a failed request, 0 otherwise.
    pub failed: String,
    /// Counter incremented once per completed iteration.
    pub iterations: String,
    /// Gauge of concurrently active virtual users.
    pub vus: String,
    /// Metric whose `url` tag is used to infer the tested target.
    pub requests: String,
}

impl MetricNames {
    pub fn http() -> Self {
        Self {
            duration: "http_req_duration".to_string(),
            failed: "http_req_failed".to_string(),
            iterations: "iterations".to_string(),
            vus: "vus".to_string(),
            requests: "http_reqs".to_string(),
        }
    }

    /// The browser module reports no `http_reqs` counter, so the duration
    /// trend doubles as the URL source.
    pub fn browser() -> Self {
        Self {
            duration: "browser_http_req_duration".to_string(),
            failed: "browser_http_req_failed".to_string(),
            iterations: "iterations".to_string(),
            vus: "vus".to_string(),
            requests: "browser_http_req_duration".to_string(),
        }
    }
}

impl Default for MetricNames {
    fn default() -> Self {
        Self::http()
    }
}
